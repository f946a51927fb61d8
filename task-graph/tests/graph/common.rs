//! Common test utilities for graph tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use task_graph::config::GraphConfig;
use task_graph::GraphBuilder;
use task_graph_sdk::{CompletionError, CompletionRequest, GraphResponse, TextCompletion};

/// Prompt fragments identifying each completion call
pub const TITLE_PROMPT: &str = "Generate a concise";
pub const RESEARCH_CHECK_PROMPT: &str = "EXTERNAL RESOURCES";
pub const SOURCES_PROMPT: &str = "Generate research sources";
pub const ANALYSIS_PROMPT: &str = "Analyze dependencies";

/// Completion double answering by prompt substring
///
/// The first route whose fragment occurs in the prompt answers; unmatched
/// prompts fail with `Unavailable`.
#[derive(Default)]
pub struct ScriptedCompletion {
    routes: Vec<(String, Result<String, CompletionError>)>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, fragment: &str, response: &str) -> Self {
        self.routes
            .push((fragment.to_string(), Ok(response.to_string())));
        self
    }

    pub fn fail(mut self, fragment: &str, error: CompletionError) -> Self {
        self.routes.push((fragment.to_string(), Err(error)));
        self
    }

    /// Number of received prompts containing `fragment`
    pub fn calls_matching(&self, fragment: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains(fragment))
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextCompletion for ScriptedCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        self.routes
            .iter()
            .find(|(fragment, _)| request.prompt.contains(fragment.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| Err(CompletionError::Unavailable("no scripted response".into())))
    }
}

/// Completion double that always fails
#[derive(Default)]
pub struct FailingCompletion {
    calls: AtomicUsize,
}

impl FailingCompletion {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextCompletion for FailingCompletion {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CompletionError::Unavailable("connection refused".into()))
    }
}

/// Completion double that never answers
pub struct HangingCompletion;

#[async_trait]
impl TextCompletion for HangingCompletion {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, CompletionError> {
        std::future::pending::<Result<String, CompletionError>>().await
    }
}

pub fn fixed_clock() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
}

/// Builder over `service` with a fixed clock and a short timeout
pub fn builder(service: Arc<dyn TextCompletion>) -> GraphBuilder {
    let config = GraphConfig {
        request_timeout_secs: 5,
        ..Default::default()
    };
    GraphBuilder::new(service, &config).with_clock(fixed_clock)
}

/// Every edge endpoint exists among the nodes
pub fn assert_no_dangling_edges(graph: &GraphResponse) {
    for edge in &graph.edges {
        assert!(graph.node(&edge.source).is_some(), "dangling source in {:?}", edge);
        assert!(graph.node(&edge.target).is_some(), "dangling target in {:?}", edge);
    }
}

/// Critical path holds only task ids, each at most once
pub fn assert_valid_critical_path(graph: &GraphResponse) {
    let mut seen = std::collections::HashSet::new();
    for id in &graph.critical_path {
        assert!(
            graph.node(id).and_then(|n| n.as_task()).is_some(),
            "critical path entry {} is not a task",
            id
        );
        assert!(seen.insert(id.clone()), "critical path repeats {}", id);
    }
}
