//! LLM-based structured extraction.
//!
//! This crate provides:
//! - [`LlmClient`] — a small client for OpenAI-compatible chat endpoints
//! - [`ExtractionSchema`] — the JSON schema built from a profile's fields
//! - [`parse_items`] — tolerant parsing of model output into records
//! - [`LlmExtractor`] — runs extraction over chunked page Markdown
//! - [`UsageTracker`] — token accounting across requests

pub mod client;
pub mod extractor;
pub mod parse;
pub mod schema;
pub mod usage;

pub use client::{ChatRequest, ChatResponse, LlmClient, Message, ResponseFormat, Usage};
pub use extractor::{ExtractorConfig, LlmExtractor};
pub use parse::parse_items;
pub use schema::ExtractionSchema;
pub use usage::UsageTracker;
