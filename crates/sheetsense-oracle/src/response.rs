//! Tolerant JSON extraction from free-text oracle replies

use lazy_regex::regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Pull the first JSON object or array out of a reply
///
/// Code fences are stripped. The outermost bracket pair whose opening
/// character appears first in the text is tried first, then the other kind.
pub fn extract_json(raw: &str) -> Option<Value> {
    let text = strip_fences(raw.trim());
    if text.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        if value.is_object() || value.is_array() {
            return Some(value);
        }
    }

    let array = span(text, '[', ']');
    let object = span(text, '{', '}');
    let ordered = match (array, object) {
        (Some(a), Some(o)) if o.0 < a.0 => [Some(o), Some(a)],
        (a, o) => [a, o],
    };

    ordered
        .into_iter()
        .flatten()
        .find_map(|(start, end)| serde_json::from_str::<Value>(&text[start..=end]).ok())
}

/// Extract JSON from a reply and deserialize it as `T`
pub fn parse_reply<T: DeserializeOwned>(raw: &str) -> Option<T> {
    extract_json(raw).and_then(|value| serde_json::from_value(value).ok())
}

fn strip_fences(text: &str) -> &str {
    let fence = regex!(r"^```[a-zA-Z]*\s*\n?");
    let text = match fence.find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    };
    text.trim_end().trim_end_matches("```").trim()
}

fn span(text: &str, open: char, close: char) -> Option<(usize, usize)> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then_some((start, end))
}
