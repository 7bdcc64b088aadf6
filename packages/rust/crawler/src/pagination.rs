//! Page URL construction for paginated search results.

use url::Url;

use pagesift_shared::{PageSiftError, Result};

/// URL of results page `page`: `base` with `page_param` set to the page number.
///
/// An existing `page_param` in `base` is replaced; every other query pair is
/// kept in its original order.
pub fn page_url(base: &str, page_param: &str, page: u32) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| PageSiftError::validation(format!("invalid base URL '{base}': {e}")))?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != page_param)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(page_param, &page.to_string());
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_page_after_existing_query() {
        let url = page_url(
            "https://www.masalledesport.com/recherche?lat=48.8575475&lng=2.3513765&city=Paris",
            "page",
            3,
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.masalledesport.com/recherche?lat=48.8575475&lng=2.3513765&city=Paris&page=3"
        );
    }

    #[test]
    fn replaces_existing_page_param() {
        let url = page_url("https://example.com/search?page=7&q=js", "page", 2).unwrap();
        assert_eq!(url.as_str(), "https://example.com/search?q=js&page=2");
    }

    #[test]
    fn works_without_query() {
        let url = page_url("https://example.com/search", "p", 1).unwrap();
        assert_eq!(url.as_str(), "https://example.com/search?p=1");
    }

    #[test]
    fn rejects_invalid_base() {
        assert!(page_url("::not a url", "page", 1).is_err());
    }
}
