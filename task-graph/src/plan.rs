//! Execution batches derived from an assembled graph.
//!
//! A `dependency` edge runs from the task that must finish first to the task
//! that waits on it, the same direction as the sequential fallback chain and
//! the critical path. A task is scheduled once every source pointing at it
//! sits in an earlier batch.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use task_graph_sdk::{EdgeKind, GraphResponse};
use tracing::{debug, warn};

/// Task ids grouped into batches that can run in parallel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionBatches {
    pub batches: Vec<Vec<String>>,
    /// The last batch holds tasks whose dependencies never resolved
    pub cycle_detected: bool,
}

/// Layer the task nodes of `graph` by their dependency edges
///
/// Within a batch tasks keep their node order. On a cycle the remaining
/// tasks form one final batch.
pub fn execution_batches(graph: &GraphResponse) -> ExecutionBatches {
    let task_ids: Vec<&str> = graph.task_nodes().map(|t| t.id.as_str()).collect();

    let mut requires: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in graph.edges_of_kind(EdgeKind::Dependency) {
        requires
            .entry(edge.target.as_str())
            .or_default()
            .push(edge.source.as_str());
    }

    let mut scheduled: HashSet<&str> = HashSet::new();
    let mut batches = Vec::new();
    let mut cycle_detected = false;

    while scheduled.len() < task_ids.len() {
        let current_batch: Vec<&str> = task_ids
            .iter()
            .copied()
            .filter(|id| !scheduled.contains(id))
            .filter(|id| {
                requires
                    .get(id)
                    .map_or(true, |deps| deps.iter().all(|dep| scheduled.contains(dep)))
            })
            .collect();

        if current_batch.is_empty() {
            let remaining: Vec<String> = task_ids
                .iter()
                .filter(|id| !scheduled.contains(*id))
                .map(|id| id.to_string())
                .collect();
            warn!(tasks = ?remaining, "Circular dependency detected, scheduling remaining tasks together");
            batches.push(remaining);
            cycle_detected = true;
            break;
        }

        scheduled.extend(current_batch.iter().copied());
        batches.push(current_batch.into_iter().map(str::to_string).collect());
    }

    debug!(batches = batches.len(), cycle_detected, "Execution plan built");
    ExecutionBatches {
        batches,
        cycle_detected,
    }
}
