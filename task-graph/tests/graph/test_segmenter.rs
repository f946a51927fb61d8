//! Tests for task segmentation as seen through the builder

use super::common::*;
use std::sync::Arc;
use task_graph::segmenter::{segment, segment_with_continuations};

// ============================================================================
// Node Count Tests
// ============================================================================

#[tokio::test]
async fn test_node_count_matches_bullets() {
    let builder = builder(Arc::new(FailingCompletion::default()));

    for count in [1, 2, 5, 7] {
        let text: String = (0..count).map(|i| format!("- Task number {}\n", i)).collect();
        let graph = builder.build_graph(&[text]).await;
        assert_eq!(graph.task_nodes().count(), count);
        assert_no_dangling_edges(&graph);
        assert_valid_critical_path(&graph);
    }
}

#[tokio::test]
async fn test_marker_agnostic_graphs() {
    let builder = builder(Arc::new(FailingCompletion::default()));
    let mut renderings = Vec::new();

    for marker in ["-", "*", "•"] {
        let text = format!("{m} Draft outline\n{m} Write chapters\n{m} Proofread", m = marker);
        let graph = builder.build_graph(&[text]).await;
        renderings.push(serde_json::to_string(&graph).unwrap());
    }

    assert_eq!(renderings[0], renderings[1]);
    assert_eq!(renderings[1], renderings[2]);
}

#[tokio::test]
async fn test_multiple_inputs_are_joined() {
    let builder = builder(Arc::new(FailingCompletion::default()));
    let graph = builder.build_graph(&["- Buy paint", "- Paint fence\n- Clean brushes"]).await;

    let originals: Vec<&str> = graph
        .task_nodes()
        .map(|t| t.data.original_text.as_str())
        .collect();
    assert_eq!(originals, vec!["Buy paint", "Paint fence", "Clean brushes"]);
}

// ============================================================================
// Strategy Tests
// ============================================================================

#[test]
fn test_plain_lines_without_bullets() {
    assert_eq!(
        segment("Write report\nEdit report\n\nSubmit report"),
        vec!["Write report", "Edit report", "Submit report"]
    );
}

#[test]
fn test_continuation_variant_differs_from_per_line() {
    let text = "- Write the report\n  with charts\n- Send it";
    assert_eq!(segment(text), vec!["Write the report", "Send it"]);
    assert_eq!(
        segment_with_continuations(text),
        vec!["Write the report with charts", "Send it"]
    );
}
