//! Dependency analysis across all tasks.
//!
//! One completion call describes every task by index and asks for dependency
//! pairs plus a critical path. The answer is validated entry by entry: invalid
//! entries are dropped, a response that cannot be parsed at all degrades the
//! whole analysis.

use anyhow::{bail, Result};
use serde_json::Value;
use task_graph_sdk::{task_id, CompletionRequest, Edge};
use tracing::{debug, warn};

use crate::completion::CompletionGate;
use crate::error::GraphIssue;
use crate::fallback::{natural_order, CompletionPolicy, Operation, Resolved};
use crate::util::json::{extract_code_block, extract_json_object, parse_json_lenient, strip_non_printable};

const ANALYSIS_SYSTEM_PROMPT: &str = r#"You are a task dependency analyzer. Your job is to determine relationships between tasks.

Return ONLY valid JSON with these fields:
- dependencies: array of task INDEX PAIRS [[0,1], [1,2]] showing which tasks depend on others
- critical_path: array of task INDEXES in execution order [0,1,2,3]

DO NOT include any explanation, reasoning, or thinking. ONLY return JSON like:
{"dependencies": [[0,1], [1,2]], "critical_path": [0,1,2,3]}"#;

/// Validated outcome of dependency analysis
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    /// `dependency` edges between task ids
    pub dependencies: Vec<Edge>,
    /// Task ids in execution order; may contain duplicates
    pub critical_path: Vec<String>,
    /// Set when the analysis could not be used
    pub error: Option<GraphIssue>,
}

impl AnalysisResult {
    /// No pairs, natural order, degraded with `reason`
    pub fn failed(task_count: usize, reason: impl Into<String>) -> Self {
        Self {
            dependencies: Vec::new(),
            critical_path: natural_order(task_count),
            error: Some(GraphIssue::AnalysisDegraded(reason.into())),
        }
    }

    pub fn cancelled(task_count: usize) -> Self {
        Self {
            dependencies: Vec::new(),
            critical_path: natural_order(task_count),
            error: Some(GraphIssue::Cancelled),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    /// Short error tag, e.g. `AI analysis failed: completion timed out after 60s`
    pub fn error_tag(&self) -> Option<String> {
        match self.error.as_ref()? {
            GraphIssue::AnalysisDegraded(reason) => Some(format!("AI analysis failed: {}", reason)),
            other => Some(other.to_string()),
        }
    }
}

pub fn analysis_request<S: AsRef<str>>(tasks: &[S]) -> CompletionRequest {
    let task_list = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| format!("{}. {}", i, task.as_ref()))
        .collect::<Vec<_>>()
        .join("\n");

    CompletionRequest::new(format!("Analyze dependencies between these tasks:\n{}", task_list))
        .with_system(ANALYSIS_SYSTEM_PROMPT)
        .with_temperature(Operation::DependencyAnalysis.temperature())
}

/// Parse and validate an analysis response for `task_count` tasks
///
/// Errors only when no JSON object can be recovered.
pub fn parse_analysis(response: &str, task_count: usize) -> Result<AnalysisResult> {
    let block = extract_code_block(response);
    let Some(object) = extract_json_object(&block).or_else(|| extract_json_object(response)) else {
        bail!("no JSON object found in response");
    };

    let value: Value = parse_json_lenient(&strip_non_printable(object))?;
    let Value::Object(analysis) = value else {
        bail!("analysis response is not a JSON object");
    };

    let dependencies = analysis
        .get("dependencies")
        .and_then(Value::as_array)
        .map(|pairs| {
            pairs
                .iter()
                .filter_map(|pair| coerce_pair(pair, task_count))
                .map(|(a, b)| Edge::dependency(task_id(a), task_id(b)))
                .collect()
        })
        .unwrap_or_default();

    let critical_path: Vec<String> = match analysis.get("critical_path") {
        None => natural_order(task_count),
        Some(entries) => entries
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| coerce_index(entry, task_count))
                    .map(task_id)
                    .collect()
            })
            .unwrap_or_default(),
    };

    let critical_path = if critical_path.is_empty() {
        natural_order(task_count)
    } else {
        critical_path
    };

    Ok(AnalysisResult {
        dependencies,
        critical_path,
        error: None,
    })
}

fn coerce_pair(pair: &Value, task_count: usize) -> Option<(usize, usize)> {
    match pair.as_array()?.as_slice() {
        [a, b] => {
            let a = coerce_index(a, task_count)?;
            let b = coerce_index(b, task_count)?;
            (a != b).then_some((a, b))
        }
        _ => None,
    }
}

/// Integer or decimal string within `[0, task_count)`
pub fn coerce_index(value: &Value, task_count: usize) -> Option<usize> {
    let index = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    let index = usize::try_from(index).ok()?;
    (index < task_count).then_some(index)
}

/// Runs the single analysis call through the request gate
pub struct DependencyAnalyzer<'a> {
    gate: &'a CompletionGate,
    policy: CompletionPolicy,
}

impl<'a> DependencyAnalyzer<'a> {
    pub fn new(gate: &'a CompletionGate, policy: CompletionPolicy) -> Self {
        Self { gate, policy }
    }

    /// Analyze `tasks`; never fails, degraded results carry an error
    pub async fn analyze(&self, tasks: &[String]) -> AnalysisResult {
        let task_count = tasks.len();
        let resolved = self
            .policy
            .resolve(
                self.gate,
                Operation::DependencyAnalysis,
                analysis_request(tasks),
                |text| parse_analysis(text, task_count),
                |reason| AnalysisResult::failed(task_count, reason),
            )
            .await;

        if let Resolved::Completed(ref analysis) = resolved {
            debug!(
                dependencies = analysis.dependencies.len(),
                critical_path = ?analysis.critical_path,
                "Dependency analysis parsed"
            );
        }
        let analysis = resolved.into_value();
        if let Some(tag) = analysis.error_tag() {
            warn!("{}", tag);
        }
        analysis
    }
}
