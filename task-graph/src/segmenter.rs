//! Splitting raw text into task descriptions.
//!
//! Parsing is an ordered chain of pure strategies; the first strategy that
//! yields at least one task wins. The per-line variant ([`segment`]) keeps a
//! stable index for every task and is what the graph pipeline uses.
//! [`segment_with_continuations`] folds non-bullet lines into the open task.

use tracing::debug;

/// One parsing strategy: text in, task descriptions out
pub type Strategy = fn(&str) -> Vec<String>;

/// Strategies tried in order by [`segment`]
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("dash_bullets", dash_bullets),
    ("symbol_bullets", symbol_bullets),
    ("non_blank_lines", non_blank_lines),
];

fn is_bullet(c: char) -> bool {
    matches!(c, '-' | '•' | '*')
}

/// Join several input blobs into one text
pub fn join_inputs<S: AsRef<str>>(inputs: &[S]) -> String {
    inputs
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Per-line segmentation through [`STRATEGIES`]
///
/// Returns an empty vector when no strategy finds a task.
pub fn segment(text: &str) -> Vec<String> {
    for (name, strategy) in STRATEGIES {
        let tasks = strategy(text);
        if !tasks.is_empty() {
            debug!(strategy = name, count = tasks.len(), "Segmented input");
            return tasks;
        }
    }
    Vec::new()
}

/// Lines starting with `-`
pub fn dash_bullets(text: &str) -> Vec<String> {
    bullet_lines(text, |c| c == '-')
}

/// Lines starting with `•` or `*`
pub fn symbol_bullets(text: &str) -> Vec<String> {
    bullet_lines(text, |c| c == '•' || c == '*')
}

/// Every non-blank line, trimmed
pub fn non_blank_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn bullet_lines(text: &str, marker: impl Fn(char) -> bool) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let body = line.trim_start().strip_prefix(|c: char| marker(c))?.trim();
            (!body.is_empty()).then(|| body.to_string())
        })
        .collect()
}

/// Continuation-aware segmentation
///
/// A bullet line (`-`, `•`, `*`) opens a task; any other non-blank line is
/// appended to the open task with a single space. Text before the first
/// bullet is ignored.
pub fn segment_with_continuations(text: &str) -> Vec<String> {
    let mut tasks = Vec::new();
    let mut current = String::new();

    for line in text.lines().map(str::trim) {
        if let Some(body) = line.strip_prefix(is_bullet) {
            if !current.is_empty() {
                tasks.push(std::mem::take(&mut current));
            }
            current = body.trim().to_string();
        } else if !line.is_empty() && !current.is_empty() {
            current.push(' ');
            current.push_str(line);
        }
    }

    if !current.is_empty() {
        tasks.push(current);
    }

    tasks
}
