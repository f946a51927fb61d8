//! Fallback behaviour of the pipeline.
//!
//! Every completion call goes through [`CompletionPolicy::resolve`], which
//! pairs the call with its parser and the operation's fallback value, so no
//! call site handles service failures on its own. The rest of this module
//! holds the deterministic substitutes used when AI-assisted steps fail.

use chrono::{DateTime, Utc};
use std::fmt;
use task_graph_sdk::{log_fallback, task_id, CompletionRequest, Edge, GraphResponse};
use tracing::{debug, warn};

use crate::analyzer::AnalysisResult;
use crate::assembler::assemble;
use crate::completion::CompletionGate;
use crate::error::GraphIssue;
use crate::synthesizer::fallback_task;

/// Kinds of completion-backed operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Title,
    ResearchCheck,
    ResearchSources,
    DependencyAnalysis,
}

impl Operation {
    /// Sampling temperature used for this operation
    pub fn temperature(self) -> f32 {
        match self {
            Operation::Title | Operation::ResearchCheck => 0.1,
            Operation::ResearchSources => 0.3,
            Operation::DependencyAnalysis => 0.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::Title => "title",
            Operation::ResearchCheck => "research_check",
            Operation::ResearchSources => "research_sources",
            Operation::DependencyAnalysis => "dependency_analysis",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a policy-guarded completion
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<T> {
    /// The service answered and the answer parsed
    Completed(T),
    /// The fallback value, with the reason the service result was unusable
    Fallback { value: T, reason: String },
}

impl<T> Resolved<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Resolved::Completed(_))
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            Resolved::Completed(_) => None,
            Resolved::Fallback { reason, .. } => Some(reason),
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Resolved::Completed(value) | Resolved::Fallback { value, .. } => value,
        }
    }
}

/// Retry/fallback policy shared by every completion call site
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionPolicy {
    max_retries: u32,
}

impl CompletionPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run `request` for `operation`, parse the answer, or fall back
    ///
    /// Transient failures (`Unavailable`, `Timeout`) are retried up to
    /// `max_retries` times. Any other failure, or a parse error, yields
    /// `fallback(reason)`. Never fails.
    pub async fn resolve<T, P, F>(
        &self,
        gate: &CompletionGate,
        operation: Operation,
        request: CompletionRequest,
        parse: P,
        fallback: F,
    ) -> Resolved<T>
    where
        P: FnOnce(&str) -> anyhow::Result<T>,
        F: FnOnce(&str) -> T,
    {
        let request = request.with_temperature(operation.temperature());
        let mut attempt = 0;

        let outcome = loop {
            match gate.complete(request.clone()).await {
                Ok(text) => break parse(&text).map_err(|e| format!("{:#}", e)),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    debug!(%operation, attempt, error = %err, "Retrying completion");
                }
                Err(err) => break Err(err.to_string()),
            }
        };

        match outcome {
            Ok(value) => Resolved::Completed(value),
            Err(reason) => {
                warn!(%operation, %reason, "Completion unusable, using fallback");
                log_fallback!(operation, reason);
                Resolved::Fallback {
                    value: fallback(&reason),
                    reason,
                }
            }
        }
    }
}

/// `task_i -> task_{i+1}` for every consecutive pair
pub fn sequential_chain(task_count: usize) -> Vec<Edge> {
    (1..task_count)
        .map(|i| Edge::dependency(task_id(i - 1), task_id(i)))
        .collect()
}

/// `task_0 .. task_{n-1}`
pub fn natural_order(task_count: usize) -> Vec<String> {
    (0..task_count).map(task_id).collect()
}

/// Payload returned when segmentation finds no tasks
pub fn no_tasks_response() -> GraphResponse {
    GraphResponse::empty_with_warning(GraphIssue::NoTasksIdentified.to_string())
}

/// Graph built without any completion calls after a cancelled build
pub fn cancelled_graph(tasks: &[String], created_at: DateTime<Utc>) -> GraphResponse {
    let synthesized = tasks
        .iter()
        .enumerate()
        .map(|(index, text)| fallback_task(index, text, created_at))
        .collect();
    assemble(synthesized, AnalysisResult::cancelled(tasks.len()))
}
