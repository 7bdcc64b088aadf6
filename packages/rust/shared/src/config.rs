//! Application configuration for pagesift.
//!
//! User config lives at `~/.pagesift/pagesift.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PageSiftError, Result};
use crate::profiles::builtin_profiles;
use crate::types::Profile;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "pagesift.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".pagesift";

// ---------------------------------------------------------------------------
// Config structs (matching pagesift.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// LLM provider settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// User-defined profiles; a name matching a built-in replaces it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<Profile>,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory CSV files are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Pause after each successfully scraped page.
    #[serde(default = "default_delay")]
    pub page_delay_ms: u64,

    /// Pause before each page fetch.
    #[serde(default = "default_delay")]
    pub pre_fetch_delay_ms: u64,

    /// HTTP timeout for page fetches and LLM calls.
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// User-Agent override for page fetches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            page_delay_ms: default_delay(),
            pre_fetch_delay_ms: default_delay(),
            request_timeout_secs: default_timeout(),
            user_agent: None,
        }
    }
}

fn default_output_dir() -> String {
    ".".into()
}
fn default_delay() -> u64 {
    6_000
}
fn default_timeout() -> u64 {
    30
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// `provider/model`, e.g. `groq/deepseek-r1-distill-llama-70b`.
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Name of the env var holding the API key (never store the key itself).
    /// Derived from the provider prefix when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// OpenAI-compatible endpoint root. Derived from the provider prefix when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Approximate token budget per chunk of page Markdown sent to the LLM.
    #[serde(default = "default_chunk_tokens")]
    pub chunk_token_threshold: usize,

    /// Ask the provider for a JSON object response.
    #[serde(default = "default_true")]
    pub json_mode: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key_env: None,
            base_url: None,
            temperature: None,
            max_tokens: None,
            chunk_token_threshold: default_chunk_tokens(),
            json_mode: true,
        }
    }
}

fn default_provider() -> String {
    "groq/deepseek-r1-distill-llama-70b".into()
}
fn default_chunk_tokens() -> usize {
    2048
}
fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Provider resolution
// ---------------------------------------------------------------------------

/// Known OpenAI-compatible providers: prefix, endpoint, key variable.
const KNOWN_PROVIDERS: &[(&str, &str, Option<&str>)] = &[
    ("groq", "https://api.groq.com/openai/v1", Some("GROQ_API_KEY")),
    ("openai", "https://api.openai.com/v1", Some("OPENAI_API_KEY")),
    ("openrouter", "https://openrouter.ai/api/v1", Some("OPENROUTER_API_KEY")),
    ("deepseek", "https://api.deepseek.com/v1", Some("DEEPSEEK_API_KEY")),
    ("ollama", "http://localhost:11434/v1", None),
];

impl LlmConfig {
    /// Split `provider/model` into its parts. The model may itself contain `/`.
    pub fn provider_and_model(&self) -> Result<(&str, &str)> {
        match self.provider.split_once('/') {
            Some((provider, model)) if !provider.is_empty() && !model.is_empty() => {
                Ok((provider, model))
            }
            _ => Err(PageSiftError::config(format!(
                "invalid llm.provider '{}': expected 'provider/model'",
                self.provider
            ))),
        }
    }

    /// Model id sent in chat requests.
    pub fn model(&self) -> Result<&str> {
        Ok(self.provider_and_model()?.1)
    }

    /// Endpoint root for chat completions.
    pub fn resolved_base_url(&self) -> Result<String> {
        if let Some(url) = &self.base_url {
            return Ok(url.trim_end_matches('/').to_string());
        }
        let (provider, _) = self.provider_and_model()?;
        KNOWN_PROVIDERS
            .iter()
            .find(|(name, _, _)| *name == provider)
            .map(|(_, url, _)| url.to_string())
            .ok_or_else(|| {
                PageSiftError::config(format!(
                    "unknown LLM provider '{provider}': set llm.base_url"
                ))
            })
    }

    /// Env var holding the API key, or `None` for providers that need no key.
    pub fn resolved_api_key_env(&self) -> Result<Option<String>> {
        if let Some(var) = &self.api_key_env {
            return Ok(Some(var.clone()));
        }
        let (provider, _) = self.provider_and_model()?;
        match KNOWN_PROVIDERS.iter().find(|(name, _, _)| *name == provider) {
            Some((_, _, var)) => Ok(var.map(String::from)),
            None => Ok(Some(format!(
                "{}_API_KEY",
                provider.to_ascii_uppercase().replace('-', "_")
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Profile lookup
// ---------------------------------------------------------------------------

impl AppConfig {
    /// All profiles: user-defined ones first, then built-ins they don't replace.
    pub fn all_profiles(&self) -> Vec<Profile> {
        let mut all = self.profiles.clone();
        for builtin in builtin_profiles() {
            if !all.iter().any(|p| p.name == builtin.name) {
                all.push(builtin);
            }
        }
        all
    }

    /// Find a profile by name.
    pub fn profile(&self, name: &str) -> Result<Profile> {
        self.all_profiles()
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| {
                let known: Vec<String> = self.all_profiles().into_iter().map(|p| p.name).collect();
                PageSiftError::config(format!(
                    "unknown profile '{name}' (available: {})",
                    known.join(", ")
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.pagesift/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PageSiftError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.pagesift/pagesift.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PageSiftError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        PageSiftError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Write a default config file to `path` (or the default location).
/// Returns the path to the created file.
pub fn init_config(path: Option<&Path>) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| PageSiftError::io(dir, e))?;
    }

    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PageSiftError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PageSiftError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the provider's API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let Some(var_name) = config.llm.resolved_api_key_env()? else {
        return Ok(());
    };
    match std::env::var(&var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(PageSiftError::config(format!(
            "LLM API key not found. Set the {var_name} environment variable \
             (a .env file in the working directory is read at startup)."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("page_delay_ms"));
        assert!(toml_str.contains("groq/deepseek-r1-distill-llama-70b"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.page_delay_ms, 6_000);
        assert_eq!(parsed.llm.chunk_token_threshold, 2048);
        assert!(parsed.llm.json_mode);
    }

    #[test]
    fn user_profile_overrides_builtin() {
        let toml_str = r#"
[defaults]
page_delay_ms = 0

[[profiles]]
name = "gyms"
base_url = "https://gyms.example.com/search?city=Lyon"
css_selector = ".card"
no_results_marker = "Nothing here"
instruction = "Extract gyms"
dedup_key = "nom"
output_file = "lyon.csv"

[[profiles.fields]]
name = "nom"

[[profiles.fields]]
name = "note"
required = false
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        let gyms = config.profile("gyms").unwrap();
        assert_eq!(gyms.output_file, "lyon.csv");
        assert_eq!(gyms.page_param, "page");
        assert_eq!(gyms.required_keys(), vec!["nom".to_string()]);
        // The other built-in is still available.
        assert!(config.profile("javascript-courses").is_ok());
        assert_eq!(config.all_profiles().len(), 2);
    }

    #[test]
    fn unknown_profile_lists_available() {
        let err = AppConfig::default().profile("nope").unwrap_err();
        assert!(err.to_string().contains("gyms"));
    }

    #[test]
    fn provider_resolution() {
        let llm = LlmConfig::default();
        assert_eq!(llm.model().unwrap(), "deepseek-r1-distill-llama-70b");
        assert_eq!(
            llm.resolved_base_url().unwrap(),
            "https://api.groq.com/openai/v1"
        );
        assert_eq!(
            llm.resolved_api_key_env().unwrap().as_deref(),
            Some("GROQ_API_KEY")
        );

        let llm = LlmConfig {
            provider: "openrouter/meta-llama/llama-3.3-70b".into(),
            ..Default::default()
        };
        assert_eq!(llm.model().unwrap(), "meta-llama/llama-3.3-70b");

        let llm = LlmConfig {
            provider: "ollama/llama3".into(),
            ..Default::default()
        };
        assert_eq!(llm.resolved_api_key_env().unwrap(), None);
    }

    #[test]
    fn unknown_provider_needs_base_url() {
        let mut llm = LlmConfig {
            provider: "acme/model-1".into(),
            ..Default::default()
        };
        assert!(llm.resolved_base_url().is_err());
        assert_eq!(
            llm.resolved_api_key_env().unwrap().as_deref(),
            Some("ACME_API_KEY")
        );

        llm.base_url = Some("http://127.0.0.1:9000/v1/".into());
        assert_eq!(llm.resolved_base_url().unwrap(), "http://127.0.0.1:9000/v1");
    }

    #[test]
    fn malformed_provider_is_rejected() {
        let llm = LlmConfig {
            provider: "groq".into(),
            ..Default::default()
        };
        assert!(llm.model().is_err());
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.llm.api_key_env = Some("PS_TEST_NONEXISTENT_KEY_12345".into());
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));

        config.llm.api_key_env = None;
        config.llm.provider = "ollama/llama3".into();
        assert!(validate_api_key(&config).is_ok());
    }

    #[test]
    fn init_config_writes_loadable_file() {
        let dir = std::env::temp_dir().join(format!("ps-config-test-{}", uuid::Uuid::now_v7()));
        let path = dir.join("pagesift.toml");
        init_config(Some(&path)).unwrap();
        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.defaults.request_timeout_secs, 30);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
