//! Results-page fetcher.
//!
//! Fetches a single page of search results, detects the site's
//! "no results" marker, and scopes the document to the result cards
//! matched by the profile's CSS selector.

use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use pagesift_shared::{PageSiftError, Result};

/// Default User-Agent string for page requests.
const USER_AGENT: &str = concat!("pagesift/", env!("CARGO_PKG_VERSION"));

/// HTTP settings for the fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: None,
        }
    }
}

/// A fetched results page, reduced to the fragments matching the selector.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: Url,
    pub status: u16,
    /// Outer HTML of every element matching the selector, in document order.
    pub html_fragments: Vec<String>,
}

/// What a results page turned out to contain.
#[derive(Debug, Clone)]
pub enum PageOutcome {
    /// The site reported that there are no (more) results.
    NoResults,
    /// The page rendered; its selected fragments may still be empty.
    Content(FetchedPage),
}

/// Fetches results pages over a single reusable HTTP client.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let user_agent = config
            .user_agent
            .unwrap_or_else(|| USER_AGENT.to_string());

        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout)
            .build()
            .map_err(|e| PageSiftError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Fetch `url`, check it for `no_results_marker`, and select `css_selector`.
    #[instrument(skip_all, fields(url = %url, selector = css_selector))]
    pub async fn fetch_page(
        &self,
        url: &Url,
        css_selector: &str,
        no_results_marker: &str,
    ) -> Result<PageOutcome> {
        let selector = parse_selector(css_selector)?;

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| PageSiftError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PageSiftError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PageSiftError::Network(format!("{url}: body read failed: {e}")))?;

        debug!(status = status.as_u16(), bytes = body.len(), "page fetched");

        let doc = Html::parse_document(&body);

        if contains_marker(&doc, no_results_marker) {
            debug!("no-results marker found");
            return Ok(PageOutcome::NoResults);
        }

        let fragments = select_fragments(&doc, &selector);
        debug!(fragments = fragments.len(), "selected result fragments");

        Ok(PageOutcome::Content(FetchedPage {
            url: url.clone(),
            status: status.as_u16(),
            html_fragments: fragments,
        }))
    }
}

/// Parse a CSS selector, mapping the error into [`PageSiftError::Parse`].
pub fn parse_selector(css_selector: &str) -> Result<Selector> {
    Selector::parse(css_selector)
        .map_err(|e| PageSiftError::parse(format!("invalid CSS selector '{css_selector}': {e}")))
}

/// Elements whose text never renders.
const HIDDEN_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Whether the document's visible text contains `marker`.
///
/// Both sides are whitespace-normalized so line breaks in the markup
/// don't hide the message. An empty marker never matches.
fn contains_marker(doc: &Html, marker: &str) -> bool {
    let marker = collapse_whitespace(marker);
    if marker.is_empty() {
        return false;
    }
    collapse_whitespace(&visible_text(doc)).contains(&marker)
}

/// Text of the document, leaving out script, style, noscript and template contents.
fn visible_text(doc: &Html) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in doc.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|el| HIDDEN_TAGS.contains(&el.name()))
        });
        if !hidden {
            parts.push(&**text);
        }
    }
    parts.join(" ")
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Outer HTML of each element matching `selector`.
fn select_fragments(doc: &Html, selector: &Selector) -> Vec<String> {
    doc.select(selector).map(|el| el.html()).collect()
}
