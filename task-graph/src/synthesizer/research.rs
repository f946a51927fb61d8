//! Research classification and resource candidates

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use task_graph_sdk::{CompletionRequest, INVALID_URL_PLACEHOLDER};

use crate::util::json::{extract_code_block, extract_json_array, parse_json_lenient, strip_line_comments};

/// Most resources attached to a single task
pub const MAX_RESOURCES: usize = 3;
pub const MAX_RESOURCE_TITLE_CHARS: usize = 100;
pub const MAX_SUMMARY_CHARS: usize = 200;
pub const MAX_KEY_POINTS: usize = 3;

static RESEARCH_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(sources?|references?|materials?|resources?)\b").expect("keyword regex")
});
static HTTP_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://").expect("url regex"));

const SOURCES_SYSTEM_PROMPT: &str = r#"Generate 3 relevant, real-world research sources in STRICT JSON array format. Each source MUST have:
- "title": string
- "url": VALID URL string
- "summary": string
- "key_points": array of strings
Example: [{"title": "...", "url": "https://real-site.com", "summary": "...", "key_points": ["..."]}]"#;

/// Validated resource candidate
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceCandidate {
    pub title: String,
    pub url: String,
    pub summary: String,
    pub key_points: Vec<String>,
}

/// Fast path: the task text explicitly asks for sources
pub fn mentions_research_keyword(task_text: &str) -> bool {
    RESEARCH_KEYWORD.is_match(task_text)
}

pub fn research_check_request(task_text: &str) -> CompletionRequest {
    CompletionRequest::new(format!(
        r#"Should this task require EXTERNAL RESOURCES? Answer ONLY yes/no.
Examples that need resources:
- "Research vaccine efficacy studies"
- "Find sources about climate change"

Examples that DON'T need resources:
- "Study for chemistry test"
- "Finish math homework"
- "Create presentation"

Task: {}"#,
        task_text
    ))
}

/// Strict yes/no: only an answer starting with "yes" counts
pub fn parse_yes_no(response: &str) -> Result<bool> {
    Ok(response.trim().to_lowercase().starts_with("yes"))
}

pub fn sources_request(task_text: &str) -> CompletionRequest {
    CompletionRequest::new(format!("Generate research sources for: {}", task_text))
        .with_system(SOURCES_SYSTEM_PROMPT)
}

/// Parse a JSON array of resource candidates
///
/// Errors when no array can be recovered from the response. Entries that are
/// not objects are skipped; at most [`MAX_RESOURCES`] are kept.
pub fn parse_sources(response: &str) -> Result<Vec<ResourceCandidate>> {
    let body = strip_line_comments(&extract_code_block(response));

    let value: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(_) => match extract_json_array(&body) {
            Some(array) => parse_json_lenient(array)?,
            None => bail!("no JSON array found in response"),
        },
    };

    let Value::Array(entries) = value else {
        bail!("expected a JSON array of sources");
    };

    Ok(entries
        .iter()
        .take(MAX_RESOURCES)
        .filter_map(validate_candidate)
        .collect())
}

/// Validate one raw candidate object
pub fn validate_candidate(value: &Value) -> Option<ResourceCandidate> {
    let object = value.as_object()?;
    let text = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default()
    };

    let title = match text("title") {
        "" => "Untitled Source",
        title => title,
    };

    let key_points = object
        .get("key_points")
        .and_then(Value::as_array)
        .map(|points| {
            points
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .take(MAX_KEY_POINTS)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(ResourceCandidate {
        title: truncate_chars(title, MAX_RESOURCE_TITLE_CHARS),
        url: sanitize_url(text("url")),
        summary: truncate_chars(text("summary"), MAX_SUMMARY_CHARS),
        key_points,
    })
}

/// Pass through `http(s)://` URLs, replace anything else with the placeholder
pub fn sanitize_url(url: &str) -> String {
    let url = url.trim();
    if HTTP_URL.is_match(url) {
        url.to_string()
    } else {
        INVALID_URL_PLACEHOLDER.to_string()
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
