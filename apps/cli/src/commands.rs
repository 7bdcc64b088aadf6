//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use pagesift_core::{ProgressReporter, ScrapeConfig, ScrapeResult, run_scrape};
use pagesift_crawler::FetchConfig;
use pagesift_extraction::LlmExtractor;
use pagesift_shared::{AppConfig, init_config, load_config, load_config_from, validate_api_key};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// PageSift: scrape paginated listings into CSV with an LLM.
#[derive(Parser)]
#[command(
    name = "pagesift",
    version,
    about = "Scrape paginated search results into CSV using LLM extraction.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.pagesift/pagesift.toml.
    #[arg(long, global = true, env = "PAGESIFT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Scrape every results page of a profile and write the records to CSV.
    Run {
        /// Profile name (see `pagesift profiles`).
        profile: String,

        /// Output CSV path (defaults to <output_dir>/<profile output file>).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Stop after this many pages.
        #[arg(long)]
        max_pages: Option<u32>,

        /// Pause between requests, in milliseconds.
        #[arg(long)]
        delay_ms: Option<u64>,

        /// LLM to use, as provider/model (e.g. groq/llama-3.3-70b-versatile).
        #[arg(long)]
        model: Option<String>,
    },

    /// List the available scraping profiles.
    Profiles,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "pagesift=info",
        1 => "pagesift=debug",
        _ => "pagesift=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run {
            profile,
            out,
            max_pages,
            delay_ms,
            model,
        } => {
            let overrides = RunOverrides {
                out,
                max_pages,
                delay_ms,
                model,
            };
            cmd_run(config_path, &profile, overrides).await
        }
        Command::Profiles => cmd_profiles(config_path),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// Command-line overrides for a single run.
struct RunOverrides {
    out: Option<PathBuf>,
    max_pages: Option<u32>,
    delay_ms: Option<u64>,
    model: Option<String>,
}

async fn cmd_run(
    config_path: Option<&Path>,
    profile_name: &str,
    overrides: RunOverrides,
) -> Result<()> {
    let mut config = load(config_path)?;
    if let Some(model) = overrides.model {
        config.llm.provider = model;
    }

    // Validate API key before doing anything
    validate_api_key(&config)?;

    let mut profile = config.profile(profile_name)?;
    if overrides.max_pages.is_some() {
        profile.max_pages = overrides.max_pages;
    }

    let output_path = overrides
        .out
        .unwrap_or_else(|| Path::new(&config.defaults.output_dir).join(&profile.output_file));

    let defaults = &config.defaults;
    let page_delay = Duration::from_millis(overrides.delay_ms.unwrap_or(defaults.page_delay_ms));
    let pre_fetch_delay =
        Duration::from_millis(overrides.delay_ms.unwrap_or(defaults.pre_fetch_delay_ms));
    let timeout = Duration::from_secs(defaults.request_timeout_secs);

    let scrape_config = ScrapeConfig {
        profile,
        output_path,
        page_delay,
        pre_fetch_delay,
        fetch: FetchConfig {
            timeout,
            user_agent: defaults.user_agent.clone(),
        },
        chunk_token_threshold: config.llm.chunk_token_threshold,
    };

    let mut extractor = LlmExtractor::from_config(&config.llm, &scrape_config.profile, timeout)?;

    info!(
        profile = %scrape_config.profile.name,
        model = %config.llm.provider,
        output = %scrape_config.output_path.display(),
        "starting run"
    );

    let reporter = CliProgress::new();
    let result = run_scrape(&scrape_config, &mut extractor, &reporter).await?;

    // Print summary
    println!();
    println!("  Scrape finished: {}", result.stop_reason);
    println!("  Run:     {}", result.run_id);
    println!("  Profile: {}", result.profile);
    println!("  Pages:   {}", result.pages_scraped);
    println!("  Records: {}", result.records.len());
    match &result.output_path {
        Some(path) => println!("  Output:  {}", path.display()),
        None => println!("  Output:  none (no records found)"),
    }
    println!("  Time:    {:.1}s", result.elapsed.as_secs_f64());
    println!();
    println!("{}", result.usage.show_usage());

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn page_started(&self, page: u32, url: &str) {
        self.spinner.set_message(format!("Page {page}: {url}"));
    }

    fn page_done(&self, page: u32, kept: usize, total: usize) {
        self.spinner
            .set_message(format!("Page {page}: {kept} new records ({total} total)"));
    }

    fn done(&self, _result: &ScrapeResult) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// profiles / config
// ---------------------------------------------------------------------------

fn cmd_profiles(config_path: Option<&Path>) -> Result<()> {
    let config = load(config_path)?;
    for profile in config.all_profiles() {
        let fields: Vec<&str> = profile.fields.iter().map(|f| f.name.as_str()).collect();
        println!("{}", profile.name);
        println!("  url:    {}", profile.base_url);
        println!("  fields: {}", fields.join(", "));
        println!("  output: {}", profile.output_file);
    }
    Ok(())
}

fn cmd_config_init(config_path: Option<&Path>) -> Result<()> {
    let path = init_config(config_path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config: AppConfig = load(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
