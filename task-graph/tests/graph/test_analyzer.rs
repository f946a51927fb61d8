//! Tests for dependency analysis and its fallbacks

use super::common::*;
use std::sync::Arc;
use task_graph::fallback::{natural_order, sequential_chain};
use task_graph_sdk::{CompletionError, Edge, EdgeKind};

const TASKS: &str = "- Collect receipts\n- Fill in tax form\n- File tax return";

fn scripted(analysis: &str) -> Arc<ScriptedCompletion> {
    Arc::new(
        ScriptedCompletion::new()
            .route(TITLE_PROMPT, "Some Task Title")
            .route(RESEARCH_CHECK_PROMPT, "no")
            .route(ANALYSIS_PROMPT, analysis),
    )
}

fn dependency_edges(graph: &task_graph_sdk::GraphResponse) -> Vec<Edge> {
    graph.edges_of_kind(EdgeKind::Dependency).cloned().collect()
}

// ============================================================================
// Successful Analysis Tests
// ============================================================================

#[tokio::test]
async fn test_analysis_edges_and_critical_path() {
    let graph = builder(scripted(r#"{"dependencies": [[1, 0], [2, 1]], "critical_path": [0, 1, 2]}"#))
        .build_graph(&[TASKS])
        .await;

    assert_eq!(
        dependency_edges(&graph),
        vec![Edge::dependency("task_1", "task_0"), Edge::dependency("task_2", "task_1")]
    );
    assert_eq!(graph.critical_path, natural_order(3));
    assert!(graph.warning.is_none());
}

#[tokio::test]
async fn test_analysis_in_chatty_response() {
    let response = "<think>Receipts come first.</think>Here you go:\n```json\n{'dependencies': [['2', '0'],], 'critical_path': [0, 2, 1]}\n```\nHope that helps!";
    let graph = builder(scripted(response)).build_graph(&[TASKS]).await;

    assert_eq!(dependency_edges(&graph), vec![Edge::dependency("task_2", "task_0")]);
    assert_eq!(graph.critical_path, vec!["task_0", "task_2", "task_1"]);
    assert!(graph.warning.is_none());
}

#[tokio::test]
async fn test_analysis_after_unrelated_fence() {
    let response = "Order:\n```\n0 -> 1 -> 2\n```\n{\"dependencies\": [[0, 1], [1, 2]], \"critical_path\": [0, 1, 2]}";
    let graph = builder(scripted(response)).build_graph(&[TASKS]).await;

    assert_eq!(
        dependency_edges(&graph),
        vec![Edge::dependency("task_0", "task_1"), Edge::dependency("task_1", "task_2")]
    );
    assert_eq!(graph.critical_path, natural_order(3));
    assert!(graph.warning.is_none());
}

#[tokio::test]
async fn test_out_of_range_entries_never_dangle() {
    let response = r#"{"dependencies": [[0, 3], [7, 1], [1, 1], [2, 0], [2, 0]], "critical_path": [2, 2, 9, 0, 0, 1]}"#;
    let graph = builder(scripted(response)).build_graph(&[TASKS]).await;

    assert_eq!(dependency_edges(&graph), vec![Edge::dependency("task_2", "task_0")]);
    assert_eq!(graph.critical_path, vec!["task_2", "task_0", "task_1"]);
    assert_no_dangling_edges(&graph);
    assert_valid_critical_path(&graph);
}

#[tokio::test]
async fn test_empty_critical_path_uses_natural_order() {
    let graph = builder(scripted(r#"{"dependencies": [[1, 0]], "critical_path": []}"#))
        .build_graph(&[TASKS])
        .await;
    assert_eq!(graph.critical_path, natural_order(3));
    assert!(graph.warning.is_none());
}

// ============================================================================
// Fallback Tests
// ============================================================================

#[tokio::test]
async fn test_unparsable_analysis_uses_chain() {
    let graph = builder(scripted("The tasks look independent to me."))
        .build_graph(&[TASKS])
        .await;

    assert_eq!(dependency_edges(&graph), sequential_chain(3));
    assert_eq!(graph.critical_path, natural_order(3));
    let warning = graph.warning.unwrap();
    assert!(warning.starts_with("AI dependency analysis unavailable"), "{}", warning);
}

#[tokio::test]
async fn test_truncated_analysis_uses_chain() {
    let graph = builder(scripted("{\"dependencies\": [[1, 0]]")).build_graph(&[TASKS]).await;
    assert_eq!(dependency_edges(&graph), sequential_chain(3));
    assert!(graph.warning.is_some());
}

#[tokio::test]
async fn test_analysis_timeout_uses_chain() {
    let service = Arc::new(
        ScriptedCompletion::new()
            .route(TITLE_PROMPT, "Some Task Title")
            .route(RESEARCH_CHECK_PROMPT, "no")
            .fail(ANALYSIS_PROMPT, CompletionError::Timeout(std::time::Duration::from_secs(5))),
    );
    let graph = builder(service).build_graph(&[TASKS]).await;

    assert_eq!(dependency_edges(&graph), sequential_chain(3));
    assert!(graph.warning.unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_chain_keeps_resource_edges() {
    let service = Arc::new(
        ScriptedCompletion::new()
            .route(TITLE_PROMPT, "Some Task Title")
            .route(
                SOURCES_PROMPT,
                r#"[{"title": "Tax Guide", "url": "https://example.com/tax", "summary": "", "key_points": []}]"#,
            )
            .route(RESEARCH_CHECK_PROMPT, "no"),
    );
    let graph = builder(service)
        .build_graph(&["- Collect reference forms\n- File tax return"])
        .await;

    assert_eq!(graph.edges_of_kind(EdgeKind::UsesResource).count(), 1);
    assert_eq!(dependency_edges(&graph), sequential_chain(2));
    assert_no_dangling_edges(&graph);
}
