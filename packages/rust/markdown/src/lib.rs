//! HTML-to-Markdown conversion and chunking for LLM extraction.
//!
//! Converts the result-card fragments selected from a page into compact
//! Markdown using the `htmd` crate, then splits that Markdown into chunks
//! small enough for a single extraction request.

mod cleanup;

use tracing::{debug, instrument};
use url::Url;

use pagesift_shared::{PageSiftError, Result};

/// Approximate words per token used to estimate chunk sizes.
const WORD_TOKEN_RATE: f64 = 0.75;

/// Tags dropped entirely during conversion.
const SKIP_TAGS: [&str; 6] = ["script", "style", "nav", "iframe", "noscript", "svg"];

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Convert a single HTML fragment to cleaned Markdown.
pub fn convert_fragment(html: &str, base_url: Option<&Url>) -> Result<String> {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIP_TAGS.to_vec())
        .build();

    let raw = converter
        .convert(html)
        .map_err(|e| PageSiftError::Conversion(format!("htmd conversion failed: {e}")))?;

    Ok(cleanup::run_pipeline(&raw, base_url))
}

/// Convert every selected fragment of a page and join them with a blank line.
///
/// Fragments that convert to nothing are dropped, so a page whose cards are
/// all empty yields an empty string.
#[instrument(skip(fragments), fields(fragments = fragments.len()))]
pub fn fragments_to_markdown(fragments: &[String], source_url: &str) -> Result<String> {
    let base_url = Url::parse(source_url).ok();

    let mut parts = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        let md = convert_fragment(fragment, base_url.as_ref())?;
        if !md.is_empty() {
            parts.push(md);
        }
    }

    let markdown = parts.join("\n\n");
    debug!(len = markdown.len(), kept = parts.len(), "fragments converted");
    Ok(markdown)
}

// ---------------------------------------------------------------------------
// Chunking
// ---------------------------------------------------------------------------

/// Rough token estimate for a piece of text.
pub fn estimate_tokens(text: &str) -> usize {
    let words = text.split_whitespace().count();
    (words as f64 / WORD_TOKEN_RATE).ceil() as usize
}

/// Split Markdown into chunks of at most `token_threshold` estimated tokens.
///
/// Chunks break on paragraph boundaries. A single paragraph larger than the
/// threshold is split on word boundaries. A threshold of zero disables
/// chunking.
pub fn chunk_markdown(md: &str, token_threshold: usize) -> Vec<String> {
    let md = md.trim();
    if md.is_empty() {
        return Vec::new();
    }
    if token_threshold == 0 {
        return vec![md.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_tokens = 0;

    for paragraph in md.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let tokens = estimate_tokens(paragraph);

        if tokens > token_threshold {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_tokens = 0;
            }
            chunks.extend(split_words(paragraph, token_threshold));
            continue;
        }

        if current_tokens + tokens > token_threshold && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_tokens = 0;
        }

        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
        current_tokens += tokens;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Split an oversized paragraph into word runs that fit the threshold.
fn split_words(paragraph: &str, token_threshold: usize) -> Vec<String> {
    let words_per_chunk = ((token_threshold as f64) * WORD_TOKEN_RATE).floor().max(1.0) as usize;
    paragraph
        .split_whitespace()
        .collect::<Vec<_>>()
        .chunks(words_per_chunk)
        .map(|words| words.join(" "))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_fragment_keeps_text_and_links() {
        let html = r#"<div class="card"><h3><a href="/salle/gym-one-42">Gym One</a></h3>
            <p>12 rue de Rivoli, 75001 Paris</p><span>4,6</span></div>"#;
        let base = Url::parse("https://www.example.com/recherche?page=1").unwrap();
        let md = convert_fragment(html, Some(&base)).unwrap();

        assert!(md.contains("Gym One"));
        assert!(md.contains("https://www.example.com/salle/gym-one-42"));
        assert!(md.contains("12 rue de Rivoli"));
        assert!(!md.contains("<div"));
    }

    #[test]
    fn convert_fragment_skips_scripts() {
        let html = "<div><p>Visible</p><script>track()</script><nav>Menu</nav><style>.x{}</style></div>";
        let md = convert_fragment(html, None).unwrap();
        assert!(md.contains("Visible"));
        assert!(!md.contains("track()"));
        assert!(!md.contains("Menu"));
        assert!(!md.contains(".x{}"));
    }

    #[test]
    fn fragments_joined_with_blank_line() {
        let fragments = vec![
            "<div><p>First card</p></div>".to_string(),
            "<div><script>x()</script></div>".to_string(),
            "<div><p>Second card</p></div>".to_string(),
        ];
        let md = fragments_to_markdown(&fragments, "https://example.com/").unwrap();
        assert_eq!(md, "First card\n\nSecond card");
    }

    #[test]
    fn no_fragments_is_empty() {
        let md = fragments_to_markdown(&[], "https://example.com/").unwrap();
        assert!(md.is_empty());
    }

    #[test]
    fn estimate_tokens_uses_word_rate() {
        assert_eq!(estimate_tokens(""), 0);
        // 3 words / 0.75 = 4 tokens
        assert_eq!(estimate_tokens("one two three"), 4);
    }

    #[test]
    fn chunk_empty_is_empty() {
        assert!(chunk_markdown("  \n\n ", 100).is_empty());
    }

    #[test]
    fn chunk_small_input_is_single_chunk() {
        let chunks = chunk_markdown("a b c\n\nd e f", 100);
        assert_eq!(chunks, vec!["a b c\n\nd e f".to_string()]);
    }

    #[test]
    fn chunk_breaks_on_paragraphs() {
        // Each paragraph is 3 words = 4 tokens; threshold 8 fits two.
        let md = "a b c\n\nd e f\n\ng h i";
        let chunks = chunk_markdown(md, 8);
        assert_eq!(chunks, vec!["a b c\n\nd e f".to_string(), "g h i".to_string()]);
    }

    #[test]
    fn chunk_splits_oversized_paragraph() {
        let long = (0..10).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let md = format!("intro\n\n{long}");
        // threshold 4 tokens = 3 words per split chunk
        let chunks = chunk_markdown(&md, 4);
        assert_eq!(chunks[0], "intro");
        assert_eq!(chunks[1], "w0 w1 w2");
        assert_eq!(chunks.last().unwrap(), "w9");
        assert_eq!(chunks.len(), 1 + 4);
    }

    #[test]
    fn zero_threshold_disables_chunking() {
        let chunks = chunk_markdown("a\n\nb", 0);
        assert_eq!(chunks.len(), 1);
    }
}
