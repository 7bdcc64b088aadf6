//! Scrape orchestration for PageSift.
//!
//! Ties together pagination, fetching, Markdown conversion, LLM extraction
//! and CSV export into a single run ([`run_scrape`]).

pub mod pipeline;
pub mod records;

pub use pipeline::{ProgressReporter, ScrapeConfig, ScrapeResult, SilentProgress, StopReason, run_scrape};
