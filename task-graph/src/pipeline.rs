//! End-to-end graph construction.
//!
//! ```text
//! raw text ──► segment ──┬──► synthesize (worker pool) ──┬──► assemble ──► GraphResponse
//!                        └──► analyze (one call) ────────┘
//! ```
//!
//! A [`GraphBuilder`] holds no per-build state: every call gets its own
//! [`CompletionGate`], so concurrent builds share nothing but the service.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use task_graph_sdk::{log_stage_complete, log_stage_start, GraphResponse, TextCompletion};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::analyzer::DependencyAnalyzer;
use crate::assembler::assemble;
use crate::completion::CompletionGate;
use crate::config::GraphConfig;
use crate::fallback::{cancelled_graph, no_tasks_response, CompletionPolicy};
use crate::segmenter::{join_inputs, segment};
use crate::synthesizer::NodeSynthesizer;

/// Source of node creation timestamps
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Builds task graphs from raw text
#[derive(Clone)]
pub struct GraphBuilder {
    service: Arc<dyn TextCompletion>,
    config: GraphConfig,
    policy: CompletionPolicy,
    clock: Clock,
}

impl GraphBuilder {
    pub fn new(service: Arc<dyn TextCompletion>, config: &GraphConfig) -> Self {
        let config = config.clone().normalized();
        Self {
            service,
            policy: CompletionPolicy::new(config.max_retries),
            config,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the timestamp source (read once per build)
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Build a graph from one or more text blobs; never fails
    pub async fn build_graph<S: AsRef<str> + Sync>(&self, raw_task_texts: &[S]) -> GraphResponse {
        self.build_graph_with_cancel(raw_task_texts, CancellationToken::new())
            .await
    }

    /// Like [`build_graph`](Self::build_graph), returning the degraded graph
    /// as soon as `cancel` fires
    pub async fn build_graph_with_cancel<S: AsRef<str> + Sync>(
        &self,
        raw_task_texts: &[S],
        cancel: CancellationToken,
    ) -> GraphResponse {
        let run_id = Uuid::new_v4();
        self.run(raw_task_texts, cancel)
            .instrument(info_span!("build_graph", %run_id))
            .await
    }

    async fn run<S: AsRef<str> + Sync>(&self, raw_task_texts: &[S], cancel: CancellationToken) -> GraphResponse {
        log_stage_start!("segment", raw_task_texts.len());
        let tasks = segment(&join_inputs(raw_task_texts));
        if tasks.is_empty() {
            warn!("No tasks identified in input");
            return no_tasks_response();
        }
        log_stage_complete!("segment", format!("{} tasks", tasks.len()));

        let created_at = (self.clock)();
        if cancel.is_cancelled() {
            warn!("Build cancelled before synthesis");
            return cancelled_graph(&tasks, created_at);
        }

        let gate = CompletionGate::new(
            self.service.clone(),
            self.config.max_concurrent_requests,
            self.config.request_timeout(),
            cancel.clone(),
        );
        debug!(
            timeout = ?gate.timeout(),
            max_retries = self.policy.max_retries(),
            max_concurrent_tasks = self.config.max_concurrent_tasks,
            "Completion gate ready"
        );
        let synthesizer = NodeSynthesizer::new(&gate, self.policy, created_at);
        let analyzer = DependencyAnalyzer::new(&gate, self.policy);

        log_stage_start!("synthesize", tasks.len());
        let work = async {
            tokio::join!(
                synthesizer.synthesize_all(&tasks, self.config.max_concurrent_tasks),
                analyzer.analyze(&tasks)
            )
        };

        let (synthesized, analysis) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Build cancelled during synthesis");
                return cancelled_graph(&tasks, created_at);
            }
            done = work => done,
        };
        log_stage_complete!(
            "synthesize",
            format!(
                "{} tasks, analysis {}",
                synthesized.len(),
                if analysis.is_degraded() { "degraded" } else { "ok" }
            )
        );

        let graph = assemble(synthesized, analysis);
        info!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            degraded = graph.warning.is_some(),
            "Graph built"
        );
        graph
    }
}
