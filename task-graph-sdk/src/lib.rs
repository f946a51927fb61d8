//! Shared contract for the task-graph pipeline.
//!
//! - Graph model returned to callers (nodes, edges, critical path)
//! - `TextCompletion` trait implemented by text-generation backends
//! - Structured pipeline events and their logging macros

// Re-export async trait for convenience
pub use async_trait::async_trait;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Marker stored in place of a resource URL that is not `http(s)://...`
pub const INVALID_URL_PLACEHOLDER: &str = "#invalid-url";

/// Identity of the task node at `index`
pub fn task_id(index: usize) -> String {
    format!("task_{}", index)
}

/// Identity of the `resource_index`-th resource of the task at `task_index`
pub fn resource_id(task_index: usize, resource_index: usize) -> String {
    format!("res_{}_{}", task_index, resource_index)
}

// ============================================================================
// Graph Model
// ============================================================================

/// 2-D layout position of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

/// Display data of a task node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNodeData {
    /// Generated (or fallback) display title
    pub title: String,
    /// Same as `title`, kept for graph renderers that read `label`
    pub label: String,
    /// Task text as extracted from the input
    pub original_text: String,
}

/// Generation metadata of a task node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMetadata {
    /// True when the title came from the completion service
    pub ai_generated: bool,
    pub created_at: DateTime<Utc>,
}

/// Graph vertex for one extracted unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNode {
    /// `task_<index>`
    pub id: String,
    pub position: Position,
    pub data: TaskNodeData,
    /// Identities of the resource nodes owned by this task
    #[serde(default)]
    pub children: Vec<String>,
    pub metadata: TaskMetadata,
}

/// Display data of a resource node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceData {
    pub title: String,
    /// Absolute `http(s)` URL or [`INVALID_URL_PLACEHOLDER`]
    pub url: String,
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
}

/// Generation metadata of a resource node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub ai_generated: bool,
    /// Resources are never checked against the live web
    pub verified: bool,
}

/// Graph vertex for a research source attached to a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    /// `res_<taskIndex>_<resourceIndex>`
    pub id: String,
    /// Identity of the owning task node
    pub parent: String,
    pub position: Position,
    pub data: ResourceData,
    pub metadata: ResourceMetadata,
}

/// Any vertex of the output graph, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphNode {
    Task(TaskNode),
    Resource(ResourceNode),
}

impl GraphNode {
    pub fn id(&self) -> &str {
        match self {
            GraphNode::Task(node) => &node.id,
            GraphNode::Resource(node) => &node.id,
        }
    }

    pub fn as_task(&self) -> Option<&TaskNode> {
        match self {
            GraphNode::Task(node) => Some(node),
            GraphNode::Resource(_) => None,
        }
    }

    pub fn as_resource(&self) -> Option<&ResourceNode> {
        match self {
            GraphNode::Resource(node) => Some(node),
            GraphNode::Task(_) => None,
        }
    }
}

/// Edge kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Source task depends on target task
    Dependency,
    /// Source task uses target resource
    UsesResource,
}

/// Directed, typed edge between two existing nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}

impl Edge {
    pub fn dependency(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: EdgeKind::Dependency,
        }
    }

    pub fn uses_resource(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: EdgeKind::UsesResource,
        }
    }
}

/// Complete output of one graph build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphResponse {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<Edge>,
    pub critical_path: Vec<String>,
    /// Present only when a degraded or fallback mode was used
    pub warning: Option<String>,
}

impl GraphResponse {
    /// Graph with no nodes, carrying only an advisory warning
    pub fn empty_with_warning(warning: impl Into<String>) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            critical_path: Vec::new(),
            warning: Some(warning.into()),
        }
    }

    pub fn task_nodes(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.iter().filter_map(GraphNode::as_task)
    }

    pub fn resource_nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.iter().filter_map(GraphNode::as_resource)
    }

    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |edge| edge.kind == kind)
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id() == id)
    }
}

// ============================================================================
// Text Completion Contract
// ============================================================================

/// Single request to a text-generation backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            temperature: 0.3,
        }
    }

    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Failure modes of a completion backend
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompletionError {
    #[error("completion service unavailable: {0}")]
    Unavailable(String),

    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid completion response: {0}")]
    InvalidResponse(String),

    #[error("completion cancelled")]
    Cancelled,
}

impl CompletionError {
    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CompletionError::Unavailable(_) | CompletionError::Timeout(_)
        )
    }
}

/// Text-generation collaborator consumed by the pipeline
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Generate text for `request`
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}

#[async_trait]
impl<T: TextCompletion + ?Sized> TextCompletion for Arc<T> {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        (**self).complete(request).await
    }
}

// ============================================================================
// Pipeline Events
// ============================================================================

/// Tracing target carrying [`GraphLog`] events
pub const EVENT_TARGET: &str = "task_graph::event";

/// Structured events emitted while a graph is built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphLog {
    /// Pipeline stage started
    StageStarted { stage: String, items: usize },
    /// Pipeline stage completed
    StageCompleted { stage: String, message: String },
    /// One task node (and its resources) was produced
    TaskSynthesized {
        task_id: String,
        title: String,
        resources: usize,
        ai_title: bool,
    },
    /// A completion-backed step fell back to its default value
    FallbackUsed { operation: String, reason: String },
    /// An edge referenced an unknown node and was discarded
    EdgeDropped {
        source: String,
        target: String,
        reason: String,
    },
}

impl GraphLog {
    /// Emit this event as JSON on the [`EVENT_TARGET`] tracing target
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            tracing::info!(target: "task_graph::event", "{}", json);
        }
    }
}

#[macro_export]
macro_rules! log_stage_start {
    ($stage:expr, $items:expr) => {
        $crate::GraphLog::StageStarted {
            stage: $stage.to_string(),
            items: $items,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_stage_complete {
    ($stage:expr, $message:expr) => {
        $crate::GraphLog::StageCompleted {
            stage: $stage.to_string(),
            message: $message.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_task_synthesized {
    ($task_id:expr, $title:expr, $resources:expr, $ai_title:expr) => {
        $crate::GraphLog::TaskSynthesized {
            task_id: $task_id.to_string(),
            title: $title.to_string(),
            resources: $resources,
            ai_title: $ai_title,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_fallback {
    ($operation:expr, $reason:expr) => {
        $crate::GraphLog::FallbackUsed {
            operation: $operation.to_string(),
            reason: $reason.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_edge_dropped {
    ($source:expr, $target:expr, $reason:expr) => {
        $crate::GraphLog::EdgeDropped {
            source: $source.to_string(),
            target: $target.to_string(),
            reason: $reason.to_string(),
        }
        .emit();
    };
}
