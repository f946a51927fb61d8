//! Text completion backends and the request-scoped call gate.

pub mod gate;
pub mod ollama;

use once_cell::sync::Lazy;
use regex::Regex;
use task_graph_sdk::{async_trait, CompletionError, CompletionRequest, TextCompletion};

pub use gate::CompletionGate;
pub use ollama::OllamaClient;

static THINK_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("think block regex"));
static THINK_UNTERMINATED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*").expect("unterminated think regex"));

/// Remove reasoning blocks that some models emit before the answer
pub fn strip_think_blocks(text: &str) -> String {
    let closed = THINK_BLOCK.replace_all(text, "");
    THINK_UNTERMINATED.replace_all(&closed, "").trim().to_string()
}

/// Backend that is never reachable
///
/// Every call fails with `Unavailable`, which drives the pipeline down its
/// deterministic fallback path without touching the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineCompletion;

#[async_trait]
impl TextCompletion for OfflineCompletion {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, CompletionError> {
        Err(CompletionError::Unavailable("offline mode".to_string()))
    }
}
