//! JSON utilities for extracting, repairing and parsing model output

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([}\]])").expect("trailing comma regex"));

/// Extract content from markdown code blocks or raw text
///
/// Handles:
/// - ```json blocks
/// - Generic ``` blocks
/// - Raw text (returned trimmed)
pub fn extract_code_block(text: &str) -> String {
    let (start, marker_len) = match (text.find("```json"), text.find("```")) {
        (Some(pos), _) => (pos, 7),
        (None, Some(pos)) => (pos, 3),
        (None, None) => return text.trim().to_string(),
    };

    let body_start = start + marker_len;
    let body_end = text[body_start..]
        .rfind("```")
        .map(|pos| pos + body_start)
        .unwrap_or(text.len());
    text[body_start..body_end].trim().to_string()
}

/// Slice from the first `{` to the last `}` (inclusive)
pub fn extract_json_object(text: &str) -> Option<&str> {
    span_between(text, '{', '}')
}

/// Slice from the first `[` to the last `]` (inclusive)
pub fn extract_json_array(text: &str) -> Option<&str> {
    span_between(text, '[', ']')
}

fn span_between(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Keep printable ASCII only
///
/// Only safe for payloads whose meaningful content is ASCII (index lists).
pub fn strip_non_printable(text: &str) -> String {
    text.chars().filter(|c| (' '..='~').contains(c)).collect()
}

/// Drop whole-line `//` comments
pub fn strip_line_comments(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fix the two mistakes small models make most: single quotes and trailing commas
pub fn repair_json(text: &str) -> String {
    let quoted = text.replace('\'', "\"");
    TRAILING_COMMA.replace_all(&quoted, "$1").into_owned()
}

/// Parse JSON, retrying once on the repaired text
pub fn parse_json_lenient<T: DeserializeOwned>(text: &str) -> Result<T> {
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(first) => serde_json::from_str(&repair_json(text))
            .with_context(|| format!("Failed to parse JSON (before repair: {})", first)),
    }
}
