//! End-to-end pipeline tests

use super::common::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use task_graph::fallback::{natural_order, sequential_chain};
use task_graph::plan::execution_batches;
use task_graph_sdk::{EdgeKind, GraphNode};
use tokio_util::sync::CancellationToken;

const REPORT_TASKS: &str = "- Write report\n- Edit report\n- Submit report";

// ============================================================================
// Reference Scenarios
// ============================================================================

#[tokio::test]
async fn test_report_tasks_with_failing_analyzer() {
    let service = Arc::new(
        ScriptedCompletion::new()
            .route(TITLE_PROMPT, "Report Task Step")
            .route(RESEARCH_CHECK_PROMPT, "no")
            .fail(
                ANALYSIS_PROMPT,
                task_graph_sdk::CompletionError::Unavailable("model crashed".into()),
            ),
    );
    let graph = builder(service).build_graph(&[REPORT_TASKS]).await;

    assert_eq!(graph.nodes.len(), 3);
    assert!(graph.nodes.iter().all(|n| matches!(n, GraphNode::Task(_))));
    assert_eq!(graph.edges, sequential_chain(3));
    assert_eq!(
        graph.edges.iter().map(|e| (e.source.as_str(), e.target.as_str())).collect::<Vec<_>>(),
        vec![("task_0", "task_1"), ("task_1", "task_2")]
    );
    assert_eq!(graph.critical_path, vec!["task_0", "task_1", "task_2"]);
    assert!(graph.warning.unwrap().contains("model crashed"));
}

#[tokio::test]
async fn test_empty_input_makes_no_calls() {
    let service = Arc::new(FailingCompletion::default());
    let graph = builder(service.clone()).build_graph(&[""]).await;

    assert!(graph.nodes.is_empty());
    assert!(graph.edges.is_empty());
    assert!(graph.critical_path.is_empty());
    assert_eq!(
        graph.warning.as_deref(),
        Some("Couldn't identify tasks. Use clear bullet points (-) with one task per line")
    );
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn test_output_json_shape() {
    let service = Arc::new(
        ScriptedCompletion::new()
            .route(TITLE_PROMPT, "Report Task Step")
            .route(RESEARCH_CHECK_PROMPT, "no")
            .route(ANALYSIS_PROMPT, r#"{"dependencies": [[1, 0]], "critical_path": [0, 1]}"#),
    );
    let graph = builder(service).build_graph(&["- Write report\n- Edit report"]).await;
    let json = serde_json::to_value(&graph).unwrap();

    assert!(json["warning"].is_null());
    assert_eq!(json["nodes"][0]["type"], "task");
    assert_eq!(json["nodes"][0]["id"], "task_0");
    assert_eq!(json["nodes"][1]["position"]["x"], 400);
    assert_eq!(json["edges"][0]["type"], "dependency");
    assert_eq!(json["edges"][0]["source"], "task_1");
    assert_eq!(json["critical_path"][1], "task_1");
}

// ============================================================================
// Fallback Idempotence
// ============================================================================

#[tokio::test]
async fn test_fallback_graph_is_byte_identical() {
    let builder = builder(Arc::new(FailingCompletion::default()));
    let input = "- Find sources on rivers\n- Outline essay\n- Write essay\n- Cite references";

    let first = serde_json::to_string(&builder.build_graph(&[input]).await).unwrap();
    let second = serde_json::to_string(&builder.build_graph(&[input]).await).unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_total_failure_still_builds_graph() {
    let service = Arc::new(FailingCompletion::default());
    let graph = builder(service.clone())
        .build_graph(&["- Find sources on rivers\n- Outline essay"])
        .await;

    assert_eq!(graph.task_nodes().count(), 2);
    assert_eq!(graph.resource_nodes().count(), 0);
    assert!(graph.task_nodes().all(|t| !t.metadata.ai_generated));
    assert_eq!(graph.task_nodes().next().unwrap().data.title, "Find Sources On Rivers");
    assert_eq!(graph.edges_of_kind(EdgeKind::Dependency).count(), 1);
    assert_eq!(graph.critical_path, natural_order(2));
    assert!(service.calls() > 0);
}

// ============================================================================
// Concurrency and Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancellation_returns_degraded_graph() {
    let builder = builder(Arc::new(HangingCompletion));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let graph = builder.build_graph_with_cancel(&[REPORT_TASKS], cancel).await;

    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(graph.task_nodes().count(), 3);
    assert_eq!(graph.resource_nodes().count(), 0);
    assert_eq!(graph.edges, sequential_chain(3));
    assert_eq!(
        graph.warning.as_deref(),
        Some("Graph build cancelled; using sequential fallback dependencies")
    );
}

#[tokio::test]
async fn test_cancelled_empty_input_is_empty_payload() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let graph = builder(Arc::new(HangingCompletion))
        .build_graph_with_cancel(&["  "], cancel)
        .await;

    assert!(graph.nodes.is_empty());
    assert!(graph.warning.unwrap().starts_with("Couldn't identify tasks"));
}

#[tokio::test]
async fn test_concurrent_builds_share_nothing() {
    let service = Arc::new(
        ScriptedCompletion::new()
            .route(TITLE_PROMPT, "Report Task Step")
            .route(RESEARCH_CHECK_PROMPT, "no")
            .route(ANALYSIS_PROMPT, r#"{"dependencies": [], "critical_path": []}"#),
    );
    let builder = builder(service.clone());
    let other = builder.clone();

    let (a, b) = tokio::join!(
        builder.build_graph(&["- One\n- Two"]),
        other.build_graph(&["- Three"])
    );

    assert_eq!(a.task_nodes().count(), 2);
    assert_eq!(b.task_nodes().count(), 1);
    // 3 titles, 3 research checks, 2 analyses
    assert_eq!(service.total_calls(), 8);
}

#[tokio::test]
async fn test_plan_for_fallback_chain() {
    let graph = builder(Arc::new(FailingCompletion::default()))
        .build_graph(&[REPORT_TASKS])
        .await;
    let plan = execution_batches(&graph);

    assert!(!plan.cycle_detected);
    assert_eq!(plan.batches[0], vec![graph.critical_path[0].clone()]);
    assert_eq!(plan.batches, vec![vec!["task_0"], vec!["task_1"], vec!["task_2"]]);
}
