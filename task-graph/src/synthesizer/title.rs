//! Display titles for task nodes

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use task_graph_sdk::CompletionRequest;

/// Longest title kept after sanitizing
pub const MAX_TITLE_CHARS: usize = 50;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").expect("word regex"));
static TITLE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^title\s*:\s*").expect("title prefix regex"));

pub fn title_request(task_text: &str) -> CompletionRequest {
    CompletionRequest::new(format!(
        r#"Generate a concise, descriptive title (2-4 words) following these rules:
1. Use title case
2. No ending punctuation
3. Include key verbs/nouns
4. Avoid generic terms like "Task" or "Work"

Input: "{}"
Title:"#,
        task_text
    ))
}

/// Clean a generated title; errors when fewer than two words survive
pub fn parse_title(response: &str) -> Result<String> {
    let title = sanitize_title(response);
    if title.split_whitespace().count() < 2 {
        bail!("generated title too short: {:?}", title);
    }
    Ok(title)
}

/// Strip wrapping quotes, drop characters other than ASCII alphanumerics,
/// whitespace and `-`, and truncate
pub fn sanitize_title(response: &str) -> String {
    let line = response
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    let line = TITLE_PREFIX.replace(line, "");
    let line: &str = &line;

    let unquoted = line.strip_prefix(is_quote).unwrap_or(line);
    let unquoted = unquoted.strip_suffix(is_quote).unwrap_or(unquoted);

    let cleaned: String = unquoted
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .take(MAX_TITLE_CHARS)
        .collect();
    cleaned.trim().to_string()
}

/// Deterministic title: the first four words of the task, title-cased
pub fn fallback_title(task_text: &str) -> String {
    let words: Vec<String> = WORD
        .find_iter(task_text)
        .take(4)
        .map(|m| title_case(m.as_str()))
        .collect();

    if words.is_empty() {
        "Untitled Task".to_string()
    } else {
        words.join(" ")
    }
}

fn is_quote(c: char) -> bool {
    c == '"' || c == '\''
}

fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut prev_alpha = false;
    for c in word.chars() {
        if prev_alpha {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_alpha = c.is_alphabetic();
    }
    out
}
