//! Issues raised while building a graph.
//!
//! None of these abort a build. `NoTasksIdentified`, `AnalysisDegraded` and
//! `Cancelled` become the `warning` of the returned graph; the rest are only
//! logged.

/// Recoverable conditions of the graph pipeline
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphIssue {
    #[error("Couldn't identify tasks. Use clear bullet points (-) with one task per line")]
    NoTasksIdentified,

    #[error("AI dependency analysis unavailable ({0}); using sequential fallback dependencies")]
    AnalysisDegraded(String),

    #[error("Graph build cancelled; using sequential fallback dependencies")]
    Cancelled,

    #[error("resource generation skipped for {task_id}: {reason}")]
    ResourceGenerationSkipped { task_id: String, reason: String },

    #[error("edge {from} -> {to} references an unknown node")]
    UnknownEdgeReference { from: String, to: String },
}

impl GraphIssue {
    /// Whether the issue is reported to the caller as the graph warning
    pub fn is_caller_visible(&self) -> bool {
        matches!(
            self,
            GraphIssue::NoTasksIdentified | GraphIssue::AnalysisDegraded(_) | GraphIssue::Cancelled
        )
    }
}
