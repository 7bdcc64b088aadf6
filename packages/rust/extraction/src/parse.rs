//! Tolerant parsing of LLM extraction output.
//!
//! Reasoning models wrap their answer in `<think>` blocks, many models add
//! code fences, and not all of them honour the requested `{"items": …}`
//! wrapper. Everything here narrows a completion down to a list of objects.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use pagesift_shared::{PageSiftError, Record, Result};

/// Parse a completion into records. Non-object entries are dropped.
pub fn parse_items(text: &str) -> Result<Vec<Record>> {
    let cleaned = strip_wrappers(text);
    let value = parse_json_lenient(&cleaned).ok_or_else(|| {
        let preview: String = cleaned.chars().take(200).collect();
        PageSiftError::parse(format!("LLM output is not JSON: {preview}"))
    })?;

    Ok(into_items(value))
}

/// Remove reasoning blocks, `<blocks>` tags and code fences.
fn strip_wrappers(text: &str) -> String {
    static THINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"));
    static BLOCKS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"</?blocks>").expect("valid regex"));
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)```(?:json|JSON)?\s*\n?(.*?)```").expect("valid regex")
    });

    let text = THINK_RE.replace_all(text, "");
    let text = BLOCKS_RE.replace_all(&text, "");

    match FENCE_RE.captures(&text) {
        Some(caps) => caps[1].trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Parse the whole text, or failing that the outermost bracketed span.
fn parse_json_lenient(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }

    let start = text.find(|c: char| c == '[' || c == '{')?;
    let close = if text.as_bytes()[start] == b'[' { ']' } else { '}' };
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Flatten the accepted response shapes into a list of objects.
fn into_items(value: Value) -> Vec<Record> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                map.insert("items".into(), other);
                single_array_or_object(map)
            }
            None => single_array_or_object(map),
        },
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

/// An object with exactly one array value is a wrapper under another name;
/// anything else is a single record.
fn single_array_or_object(map: Record) -> Vec<Value> {
    let arrays: Vec<&Value> = map.values().filter(|v| v.is_array()).collect();
    if map.len() == 1 && arrays.len() == 1 {
        if let Some(Value::Array(items)) = map.into_iter().next().map(|(_, v)| v) {
            return items;
        }
        return Vec::new();
    }
    if map.is_empty() {
        return Vec::new();
    }
    vec![Value::Object(map)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wrapped_items() {
        let items = parse_items(r#"{"items": [{"title": "A"}, {"title": "B"}]}"#).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["title"], "B");
    }

    #[test]
    fn parses_bare_array() {
        let items = parse_items(r#"[{"nom": "Gym"}]"#).unwrap();
        assert_eq!(items[0]["nom"], "Gym");
    }

    #[test]
    fn strips_think_block_and_fences() {
        let text = "<think>The user wants gyms. {not json}</think>\n```json\n{\"items\": [{\"nom\": \"Gym\"}]}\n```";
        let items = parse_items(text).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn accepts_blocks_tags_and_prose() {
        let text = "Here you go:\n<blocks>[{\"title\": \"JS 101\"}]</blocks>\nHope this helps.";
        let items = parse_items(text).unwrap();
        assert_eq!(items[0]["title"], "JS 101");
    }

    #[test]
    fn accepts_other_wrapper_name() {
        let items = parse_items(r#"{"courses": [{"title": "A"}]}"#).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn single_object_is_one_item() {
        let items = parse_items(r#"{"title": "A", "skills": ["js"]}"#).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], "A");
    }

    #[test]
    fn drops_non_object_entries() {
        let items = parse_items(r#"[{"title": "A"}, "junk", 3]"#).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn empty_items_is_empty() {
        assert!(parse_items(r#"{"items": []}"#).unwrap().is_empty());
        assert!(parse_items("{}").unwrap().is_empty());
    }

    #[test]
    fn garbage_is_parse_error() {
        let err = parse_items("I could not find any courses.").unwrap_err();
        assert!(matches!(err, PageSiftError::Parse { .. }));
    }
}
