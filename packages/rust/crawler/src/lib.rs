//! Results-page fetching for paginated search sites.
//!
//! This crate provides:
//! - [`page_url`] — builds the URL of the n-th results page
//! - [`Fetcher`] — fetches a page, detects the "no results" marker, and
//!   scopes the document to the profile's CSS selector

pub mod fetcher;
pub mod pagination;

pub use fetcher::{FetchConfig, FetchedPage, Fetcher, PageOutcome, parse_selector};
pub use pagination::page_url;
