//! Schema-driven record extraction over chunked page Markdown.

use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use pagesift_shared::{FieldSpec, LlmConfig, PageSiftError, Profile, Record, Result};

use crate::client::{ChatRequest, LlmClient, Message, ResponseFormat};
use crate::parse::parse_items;
use crate::schema::ExtractionSchema;
use crate::usage::UsageTracker;

/// Per-profile extraction settings.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub model: String,
    pub instruction: String,
    pub fields: Vec<FieldSpec>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub json_mode: bool,
}

impl ExtractorConfig {
    /// Combine the `[llm]` settings with a profile's instruction and fields.
    pub fn for_profile(llm: &LlmConfig, profile: &Profile) -> Result<Self> {
        Ok(Self {
            model: llm.model()?.to_string(),
            instruction: profile.instruction.clone(),
            fields: profile.fields.clone(),
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            json_mode: llm.json_mode,
        })
    }
}

/// Sends page chunks to the LLM and collects the records it returns.
pub struct LlmExtractor {
    client: LlmClient,
    config: ExtractorConfig,
    schema: ExtractionSchema,
    usage: UsageTracker,
}

impl LlmExtractor {
    pub fn new(client: LlmClient, config: ExtractorConfig) -> Self {
        let schema = ExtractionSchema::from_fields(&config.fields);
        Self {
            client,
            config,
            schema,
            usage: UsageTracker::new(),
        }
    }

    /// Build a client from the `[llm]` section, reading the API key from the environment.
    pub fn from_config(llm: &LlmConfig, profile: &Profile, timeout: Duration) -> Result<Self> {
        let api_key = match llm.resolved_api_key_env()? {
            Some(var) => Some(std::env::var(&var).map_err(|_| {
                PageSiftError::config(format!("{var} is not set"))
            })?),
            None => None,
        };
        let client = LlmClient::new(llm.resolved_base_url()?, api_key, timeout)?;
        info!(base_url = %client.base_url(), model = %llm.provider, "LLM extractor ready");
        Ok(Self::new(client, ExtractorConfig::for_profile(llm, profile)?))
    }

    /// Token usage accumulated so far.
    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    /// Extract records from every chunk, in chunk order.
    ///
    /// Successful items are tagged `"error": false`. A chunk whose request or
    /// parse fails contributes one `"error": true` item carrying the message,
    /// so the rest of the page is still used. If every chunk fails the last
    /// error is returned instead.
    #[instrument(skip_all, fields(url = page_url, chunks = chunks.len()))]
    pub async fn extract(&mut self, chunks: &[String], page_url: &str) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut failed = 0;
        let mut last_error = None;

        for (index, chunk) in chunks.iter().enumerate() {
            match self.extract_chunk(chunk, page_url).await {
                Ok(items) => {
                    debug!(index, items = items.len(), "chunk extracted");
                    records.extend(items.into_iter().map(|mut item| {
                        item.entry("error").or_insert(Value::Bool(false));
                        item
                    }));
                }
                Err(e) => {
                    warn!(index, error = %e, "chunk extraction failed");
                    records.push(error_item(index, &e));
                    failed += 1;
                    last_error = Some(e);
                }
            }
        }

        if failed > 0 && failed == chunks.len() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        Ok(records)
    }

    async fn extract_chunk(&mut self, chunk: &str, page_url: &str) -> Result<Vec<Record>> {
        let mut request = ChatRequest::new(&self.config.model)
            .message(Message::system(self.system_prompt()))
            .message(Message::user(user_prompt(page_url, chunk)));
        request.temperature = self.config.temperature;
        request.max_tokens = self.config.max_tokens;
        if self.config.json_mode {
            request.response_format = Some(ResponseFormat::json_object());
        }

        let response = self.client.chat_completion(&request).await?;
        self.usage.record(response.usage);

        parse_items(&response.content)
    }

    fn system_prompt(&self) -> String {
        let schema = serde_json::to_string_pretty(&self.schema.response()).unwrap_or_default();
        format!(
            "You extract structured records from the content of a web page.\n\
             {instruction}\n\n\
             Respond with a JSON object of the form {{\"items\": [...]}} matching \
             this JSON schema:\n{schema}\n\n\
             Only include records that actually appear in the content. \
             Respond with JSON only.",
            instruction = self.config.instruction,
        )
    }
}

fn user_prompt(page_url: &str, chunk: &str) -> String {
    format!("Page URL: {page_url}\n\n<content>\n{chunk}\n</content>")
}

fn error_item(index: usize, error: &PageSiftError) -> Record {
    let mut item = Record::new();
    item.insert("index".into(), json!(index));
    item.insert("error".into(), Value::Bool(true));
    item.insert("tags".into(), json!(["error"]));
    item.insert("content".into(), Value::String(error.to_string()));
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagesift_shared::builtin_profiles;

    fn extractor_for(server: &wiremock::MockServer) -> LlmExtractor {
        let profile = builtin_profiles().remove(0);
        let llm = LlmConfig {
            provider: "test/model-x".into(),
            base_url: Some(format!("{}/v1", server.uri())),
            ..Default::default()
        };
        let client =
            LlmClient::new(llm.resolved_base_url().unwrap(), None, Duration::from_secs(5)).unwrap();
        LlmExtractor::new(client, ExtractorConfig::for_profile(&llm, &profile).unwrap())
    }

    fn completion(content: &str) -> wiremock::ResponseTemplate {
        wiremock::ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": content}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14}
        }))
    }

    #[tokio::test]
    async fn extract_tags_items_and_tracks_usage() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/v1/chat/completions"))
            .and(wiremock::matchers::body_partial_json(json!({
                "model": "model-x",
                "response_format": {"type": "json_object"}
            })))
            .respond_with(completion(r#"{"items": [{"nom": "Gym One"}, {"nom": "Gym Two"}]}"#))
            .mount(&server)
            .await;

        let mut extractor = extractor_for(&server);
        let chunks = vec!["chunk one".to_string(), "chunk two".to_string()];
        let records = extractor
            .extract(&chunks, "https://example.com/?page=1")
            .await
            .unwrap();

        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r["error"] == Value::Bool(false)));
        assert_eq!(extractor.usage().requests(), 2);
        assert_eq!(extractor.usage().total().total_tokens, 28);
    }

    #[tokio::test]
    async fn failed_chunk_becomes_error_item() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::body_string_contains("good chunk"))
            .respond_with(completion(r#"[{"nom": "Gym"}]"#))
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::body_string_contains("bad chunk"))
            .respond_with(completion("sorry, no JSON here"))
            .mount(&server)
            .await;

        let mut extractor = extractor_for(&server);
        let chunks = vec!["good chunk".to_string(), "bad chunk".to_string()];
        let records = extractor.extract(&chunks, "https://example.com/").await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["nom"], "Gym");
        assert_eq!(records[1]["error"], Value::Bool(true));
        assert_eq!(records[1]["index"], 1);
    }

    #[tokio::test]
    async fn all_chunks_failing_is_an_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/v1/chat/completions"))
            .respond_with(wiremock::ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let mut extractor = extractor_for(&server);
        let err = extractor
            .extract(&["only chunk".to_string()], "https://example.com/")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bad key"));
        assert_eq!(extractor.usage().requests(), 0);
    }

    #[tokio::test]
    async fn no_chunks_means_no_requests() {
        let server = wiremock::MockServer::start().await;
        let mut extractor = extractor_for(&server);
        let records = extractor.extract(&[], "https://example.com/").await.unwrap();
        assert!(records.is_empty());
        assert_eq!(extractor.usage().requests(), 0);
    }

    #[test]
    fn system_prompt_embeds_instruction_and_schema() {
        let profile = builtin_profiles().remove(0);
        let llm = LlmConfig::default();
        let client = LlmClient::new("http://localhost:1/v1", None, Duration::from_secs(1)).unwrap();
        let config = ExtractorConfig::for_profile(&llm, &profile).unwrap();
        let extractor = LlmExtractor::new(client, config);
        let prompt = extractor.system_prompt();
        assert!(prompt.contains(&profile.instruction));
        assert!(prompt.contains("\"lien_annonce\""));
        assert!(prompt.contains("{\"items\": [...]}"));
        assert!(prompt.contains("\"required\": [\n    \"items\"\n  ]"));
    }
}
