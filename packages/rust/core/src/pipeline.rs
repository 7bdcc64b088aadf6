//! End-to-end scrape pipeline: paginate → fetch → convert → extract → filter → CSV.
//!
//! Pages are processed strictly one after another with fixed pauses, and the
//! run stops at the first page that fails or yields nothing usable.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use pagesift_crawler::{FetchConfig, Fetcher, PageOutcome, page_url};
use pagesift_extraction::{LlmExtractor, UsageTracker};
use pagesift_shared::{Profile, Record, Result, RunId};

use crate::records::process_records;

/// Configuration for one scraping run.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Profile to scrape.
    pub profile: Profile,
    /// CSV destination.
    pub output_path: PathBuf,
    /// Pause after each page that yielded records.
    pub page_delay: Duration,
    /// Pause before each page fetch.
    pub pre_fetch_delay: Duration,
    /// HTTP settings for page fetches.
    pub fetch: FetchConfig,
    /// Approximate token budget per LLM request.
    pub chunk_token_threshold: usize,
}

/// Why the pagination loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The site showed its "no results" marker.
    NoMoreResults,
    /// The page had no selectable content or the LLM returned no records.
    EmptyPage,
    /// Records were extracted but none were complete and new.
    NoCompleteRecords,
    /// The configured page limit was reached.
    PageLimit,
    /// The page could not be fetched.
    FetchFailed(String),
    /// The selected HTML could not be converted to Markdown.
    ConversionFailed(String),
    /// Every extraction request for the page failed.
    ExtractionFailed(String),
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoMoreResults => write!(f, "no more results"),
            Self::EmptyPage => write!(f, "no records extracted"),
            Self::NoCompleteRecords => write!(f, "no complete records"),
            Self::PageLimit => write!(f, "page limit reached"),
            Self::FetchFailed(e) => write!(f, "fetch failed: {e}"),
            Self::ConversionFailed(e) => write!(f, "conversion failed: {e}"),
            Self::ExtractionFailed(e) => write!(f, "extraction failed: {e}"),
        }
    }
}

/// Result of a scraping run.
#[derive(Debug)]
pub struct ScrapeResult {
    pub run_id: RunId,
    pub profile: String,
    /// Kept records in the order they were found.
    pub records: Vec<Record>,
    /// Pages that contributed records.
    pub pages_scraped: u32,
    pub stop_reason: StopReason,
    /// Where the CSV was written; `None` when nothing was found.
    pub output_path: Option<PathBuf>,
    pub usage: UsageTracker,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called before a page is fetched.
    fn page_started(&self, page: u32, url: &str);
    /// Called after a page's records were kept.
    fn page_done(&self, page: u32, kept: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, result: &ScrapeResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn page_started(&self, _page: u32, _url: &str) {}
    fn page_done(&self, _page: u32, _kept: usize, _total: usize) {}
    fn done(&self, _result: &ScrapeResult) {}
}

/// Run the pagination loop for `config.profile`.
///
/// 1. Build the URL of the current page and pause
/// 2. Fetch it; stop on error or on the "no results" marker
/// 3. Convert the selected fragments to Markdown and extract records
/// 4. Keep complete records whose name hasn't been seen; stop if none
/// 5. Pause and move on to the next page
///
/// Collected records are written to CSV once the loop ends.
#[instrument(skip_all, fields(profile = %config.profile.name, run_id = tracing::field::Empty))]
pub async fn run_scrape(
    config: &ScrapeConfig,
    extractor: &mut LlmExtractor,
    progress: &dyn ProgressReporter,
) -> Result<ScrapeResult> {
    let start = Instant::now();
    let started_at = Utc::now();
    let run_id = RunId::new();
    tracing::Span::current().record("run_id", tracing::field::display(&run_id));

    let profile = &config.profile;
    profile.validate()?;
    pagesift_crawler::parse_selector(&profile.css_selector)?;

    let fetcher = Fetcher::new(config.fetch.clone())?;

    let mut page = profile.start_page;
    let mut pages_scraped = 0u32;
    let mut seen_names: HashSet<String> = HashSet::new();
    let mut all_records: Vec<Record> = Vec::new();

    info!(
        base_url = %profile.base_url,
        max_pages = ?profile.max_pages,
        page_delay_ms = config.page_delay.as_millis(),
        "starting scrape"
    );

    let stop_reason = loop {
        if profile.max_pages.is_some_and(|max| pages_scraped >= max) {
            break StopReason::PageLimit;
        }

        let url = page_url(&profile.base_url, &profile.page_param, page)?;
        info!(page, %url, "loading page");
        progress.page_started(page, url.as_str());

        pause(config.pre_fetch_delay).await;

        let fetched = match fetcher
            .fetch_page(&url, &profile.css_selector, &profile.no_results_marker)
            .await
        {
            Ok(PageOutcome::NoResults) => {
                info!(page, "no more results, ending crawl");
                break StopReason::NoMoreResults;
            }
            Ok(PageOutcome::Content(fetched)) => fetched,
            Err(e) => {
                warn!(page, error = %e, "failed to fetch page");
                break StopReason::FetchFailed(e.to_string());
            }
        };

        let markdown =
            match pagesift_markdown::fragments_to_markdown(&fetched.html_fragments, url.as_str()) {
                Ok(markdown) => markdown,
                Err(e) => {
                    warn!(page, error = %e, "failed to convert page");
                    break StopReason::ConversionFailed(e.to_string());
                }
            };
        let chunks = pagesift_markdown::chunk_markdown(&markdown, config.chunk_token_threshold);
        if chunks.is_empty() {
            info!(page, "no content matched the selector");
            break StopReason::EmptyPage;
        }

        let extracted = match extractor.extract(&chunks, url.as_str()).await {
            Ok(records) => records,
            Err(e) => {
                warn!(page, error = %e, "extraction failed");
                break StopReason::ExtractionFailed(e.to_string());
            }
        };
        if extracted.is_empty() {
            info!(page, "no records extracted");
            break StopReason::EmptyPage;
        }
        info!(page, extracted = extracted.len(), "records extracted");

        let kept = process_records(extracted, profile, &mut seen_names);
        if kept.is_empty() {
            info!(page, "no complete records found");
            break StopReason::NoCompleteRecords;
        }

        let kept_count = kept.len();
        info!(page, kept = kept_count, "page scraped");
        all_records.extend(kept);
        pages_scraped += 1;
        progress.page_done(page, kept_count, all_records.len());

        page += 1;
        pause(config.page_delay).await;
    };

    let output_path = if all_records.is_empty() {
        info!("no records were found during the crawl");
        None
    } else {
        pagesift_artifacts::write_csv(&config.output_path, &profile.fields, &all_records)?;
        Some(config.output_path.clone())
    };

    let result = ScrapeResult {
        run_id,
        profile: profile.name.clone(),
        records: all_records,
        pages_scraped,
        stop_reason,
        output_path,
        usage: extractor.usage().clone(),
        started_at,
        elapsed: start.elapsed(),
    };

    info!(
        records = result.records.len(),
        pages = result.pages_scraped,
        stop_reason = %result.stop_reason,
        duration_ms = result.elapsed.as_millis(),
        "scrape completed"
    );

    progress.done(&result);
    Ok(result)
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
