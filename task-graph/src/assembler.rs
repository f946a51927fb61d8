//! Merging synthesized tasks and the dependency analysis into one graph.

use std::collections::HashSet;
use task_graph_sdk::{log_edge_dropped, Edge, GraphNode, GraphResponse};
use tracing::warn;

use crate::analyzer::AnalysisResult;
use crate::error::GraphIssue;
use crate::fallback::{natural_order, sequential_chain};
use crate::synthesizer::SynthesizedTask;

/// Build the response graph
///
/// A degraded analysis is replaced by the sequential chain and natural order,
/// and its issue becomes the warning when callers are meant to see it. Edges with an unknown endpoint are
/// dropped, repeated edges are collapsed, and the critical path keeps only
/// the first occurrence of each known task id.
pub fn assemble(tasks: Vec<SynthesizedTask>, analysis: AnalysisResult) -> GraphResponse {
    let task_count = tasks.len();

    let (dependencies, critical_path, warning) = match analysis.error {
        Some(issue) => {
            let warning = if issue.is_caller_visible() {
                Some(issue.to_string())
            } else {
                warn!("{}", issue);
                None
            };
            (sequential_chain(task_count), natural_order(task_count), warning)
        }
        None => (analysis.dependencies, analysis.critical_path, None),
    };

    let mut nodes = Vec::new();
    let mut resource_edges = Vec::new();
    for task in tasks {
        nodes.push(GraphNode::Task(task.node));
        nodes.extend(task.resources.into_iter().map(GraphNode::Resource));
        resource_edges.extend(task.edges);
    }

    let (edges, critical_path) = {
        let node_ids: HashSet<&str> = nodes.iter().map(GraphNode::id).collect();
        let task_ids: HashSet<&str> = nodes
            .iter()
            .filter_map(GraphNode::as_task)
            .map(|t| t.id.as_str())
            .collect();

        let edges = valid_edges(resource_edges.into_iter().chain(dependencies), &node_ids);

        let mut seen = HashSet::new();
        let critical_path: Vec<String> = critical_path
            .into_iter()
            .filter(|id| task_ids.contains(id.as_str()) && seen.insert(id.clone()))
            .collect();

        (edges, critical_path)
    };

    GraphResponse {
        nodes,
        edges,
        critical_path,
        warning,
    }
}

fn valid_edges(edges: impl Iterator<Item = Edge>, node_ids: &HashSet<&str>) -> Vec<Edge> {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();

    for edge in edges {
        if !node_ids.contains(edge.source.as_str()) || !node_ids.contains(edge.target.as_str()) {
            let issue = GraphIssue::UnknownEdgeReference {
                from: edge.source.clone(),
                to: edge.target.clone(),
            };
            warn!("{}", issue);
            log_edge_dropped!(edge.source, edge.target, issue);
            continue;
        }
        if seen.insert(edge.clone()) {
            kept.push(edge);
        }
    }

    kept
}
