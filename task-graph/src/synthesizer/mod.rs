//! Node synthesis: one task description in, one task node (plus its research
//! resources) out.
//!
//! - **title**: Generated display titles and the deterministic fallback
//! - **research**: Research classification and resource candidates

pub mod research;
pub mod title;

use chrono::{DateTime, Utc};
use task_graph_sdk::{
    log_task_synthesized, resource_id, task_id, Edge, Position, ResourceData, ResourceMetadata,
    ResourceNode, TaskMetadata, TaskNode, TaskNodeData,
};
use tracing::{debug, warn};

use crate::completion::CompletionGate;
use crate::error::GraphIssue;
use crate::fallback::{CompletionPolicy, Operation, Resolved};
use crate::util::batch::execute_ordered;

pub use research::{
    mentions_research_keyword, parse_sources, parse_yes_no, research_check_request, sanitize_url,
    sources_request, ResourceCandidate,
};
pub use title::{fallback_title, parse_title, sanitize_title, title_request};

/// Horizontal offset of a resource from its parent task
pub const RESOURCE_OFFSET_X: i64 = 150;
/// Vertical spacing between resources of one task
pub const RESOURCE_SPACING_Y: i64 = 100;

/// Everything produced for one task
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedTask {
    pub node: TaskNode,
    pub resources: Vec<ResourceNode>,
    /// `uses_resource` edges from the task to each resource
    pub edges: Vec<Edge>,
}

/// Grid position of the task at `index`, three per row
pub fn layout_position(index: usize) -> Position {
    let index = index as i64;
    Position {
        x: 100 + (index % 3) * 300,
        y: 100 + (index / 3) * 150,
    }
}

pub fn resource_position(parent: Position, resource_index: usize) -> Position {
    Position {
        x: parent.x + RESOURCE_OFFSET_X,
        y: parent.y + resource_index as i64 * RESOURCE_SPACING_Y,
    }
}

/// Task node built without any completion call
pub fn fallback_task(index: usize, text: &str, created_at: DateTime<Utc>) -> SynthesizedTask {
    let synthesized = build_task(index, text, fallback_title(text), false, Vec::new(), created_at);
    log_task_synthesized!(synthesized.node.id, synthesized.node.data.title, 0, false);
    synthesized
}

fn build_task(
    index: usize,
    text: &str,
    title: String,
    ai_generated: bool,
    candidates: Vec<ResourceCandidate>,
    created_at: DateTime<Utc>,
) -> SynthesizedTask {
    let id = task_id(index);
    let position = layout_position(index);

    let resources: Vec<ResourceNode> = candidates
        .into_iter()
        .enumerate()
        .map(|(j, candidate)| ResourceNode {
            id: resource_id(index, j),
            parent: id.clone(),
            position: resource_position(position, j),
            data: ResourceData {
                title: candidate.title,
                url: candidate.url,
                summary: candidate.summary,
                key_points: candidate.key_points,
            },
            metadata: ResourceMetadata {
                ai_generated: true,
                verified: false,
            },
        })
        .collect();

    let edges = resources
        .iter()
        .map(|resource| Edge::uses_resource(id.clone(), resource.id.clone()))
        .collect();

    let node = TaskNode {
        id,
        position,
        data: TaskNodeData {
            label: title.clone(),
            title,
            original_text: text.to_string(),
        },
        children: resources.iter().map(|r| r.id.clone()).collect(),
        metadata: TaskMetadata {
            ai_generated,
            created_at,
        },
    };

    SynthesizedTask {
        node,
        resources,
        edges,
    }
}

/// Builds task nodes through a request-scoped [`CompletionGate`]
pub struct NodeSynthesizer<'a> {
    gate: &'a CompletionGate,
    policy: CompletionPolicy,
    created_at: DateTime<Utc>,
}

impl<'a> NodeSynthesizer<'a> {
    pub fn new(gate: &'a CompletionGate, policy: CompletionPolicy, created_at: DateTime<Utc>) -> Self {
        Self {
            gate,
            policy,
            created_at,
        }
    }

    /// Synthesize every task with at most `pool_size` in progress
    ///
    /// Results are in input order.
    pub async fn synthesize_all(&self, tasks: &[String], pool_size: usize) -> Vec<SynthesizedTask> {
        let items: Vec<&str> = tasks.iter().map(String::as_str).collect();
        let this = self;
        execute_ordered(items, pool_size, move |text, ctx| this.synthesize(ctx.index, text)).await
    }

    /// Synthesize the task at `index`; never fails
    pub async fn synthesize(&self, index: usize, text: &str) -> SynthesizedTask {
        let title = self
            .policy
            .resolve(
                self.gate,
                Operation::Title,
                title_request(text),
                parse_title,
                |_| fallback_title(text),
            )
            .await;
        let ai_generated = title.is_completed();
        let title = title.into_value();

        let candidates = if self.needs_research(text).await {
            self.resources(index, text).await
        } else {
            Vec::new()
        };

        let synthesized = build_task(index, text, title, ai_generated, candidates, self.created_at);
        log_task_synthesized!(
            synthesized.node.id,
            synthesized.node.data.title,
            synthesized.resources.len(),
            ai_generated
        );
        synthesized
    }

    async fn needs_research(&self, text: &str) -> bool {
        if mentions_research_keyword(text) {
            debug!(task = %text, "Research keyword found");
            return true;
        }

        self.policy
            .resolve(
                self.gate,
                Operation::ResearchCheck,
                research_check_request(text),
                parse_yes_no,
                |_| false,
            )
            .await
            .into_value()
    }

    async fn resources(&self, index: usize, text: &str) -> Vec<ResourceCandidate> {
        let resolved = self
            .policy
            .resolve(
                self.gate,
                Operation::ResearchSources,
                sources_request(text),
                parse_sources,
                |_| Vec::new(),
            )
            .await;

        match resolved {
            Resolved::Completed(candidates) => candidates,
            Resolved::Fallback { reason, .. } => {
                let issue = GraphIssue::ResourceGenerationSkipped {
                    task_id: task_id(index),
                    reason,
                };
                warn!("{}", issue);
                Vec::new()
            }
        }
    }
}
