//! CLI argument definitions and the command entry point.
//!
//! The binary reads task text, builds the graph and prints it as JSON on
//! stdout. Diagnostics go to stderr so the output stays machine-readable.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use task_graph_sdk::{GraphResponse, TextCompletion};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::completion::{OfflineCompletion, OllamaClient};
use crate::config::GraphConfig;
use crate::pipeline::GraphBuilder;
use crate::plan::execution_batches;

/// Turn free-form task lists into dependency graphs
///
/// Each task becomes a node with a generated title; tasks that call for
/// research get source nodes attached. Dependencies between tasks come from
/// the language model, or a sequential chain when it is unavailable.
#[derive(Parser, Debug, Clone)]
#[command(name = "task-graph")]
#[command(about = "Turn free-form task lists into dependency graphs")]
#[command(version)]
pub struct Args {
    /// File(s) containing task text; can be repeated
    #[arg(long = "input", value_name = "PATH")]
    pub inputs: Vec<PathBuf>,

    /// Task text given inline; can be repeated
    ///
    /// Inline text comes before file input. Reads stdin when neither
    /// --text nor --input is given.
    #[arg(long = "text", value_name = "TEXT", allow_hyphen_values = true)]
    pub texts: Vec<String>,

    /// Path to a YAML config file
    ///
    /// Defaults to <config_dir>/task-graph/config.yaml when it exists.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Ollama server URL
    #[arg(long, value_name = "URL")]
    pub host: Option<String>,

    /// Model name
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,

    /// Timeout for each completion call, in seconds
    #[arg(long, value_name = "N")]
    pub timeout_secs: Option<u64>,

    /// Number of tasks synthesized in parallel
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Skip the language model entirely and build the fallback graph
    #[arg(long)]
    pub offline: bool,

    /// Verify the model is installed before building
    #[arg(long)]
    pub check_model: bool,

    /// Print execution batches to stderr after the graph
    #[arg(long)]
    pub plan: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Enable debug logging
    #[arg(long)]
    pub verbose: bool,
}

impl Args {
    /// Resolve configuration with CLI flags applied last
    pub fn resolve_config(&self) -> Result<GraphConfig> {
        let mut config = GraphConfig::load(self.config.as_deref())?;

        if let Some(host) = &self.host {
            config.ollama_host = host.clone();
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(timeout) = self.timeout_secs {
            config.request_timeout_secs = timeout;
        }
        if let Some(concurrency) = self.concurrency {
            config.max_concurrent_tasks = concurrency;
        }

        Ok(config.normalized())
    }
}

/// Install the stderr log subscriber; `RUST_LOG` wins unless `--verbose`
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Gather task text from `--text`, `--input`, or stdin
pub async fn read_inputs(args: &Args) -> Result<Vec<String>> {
    let mut texts = args.texts.clone();

    for path in &args.inputs {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read input file: {}", path.display()))?;
        texts.push(content);
    }

    if texts.is_empty() {
        let mut content = String::new();
        tokio::io::stdin()
            .read_to_string(&mut content)
            .await
            .context("Failed to read tasks from stdin")?;
        texts.push(content);
    }

    Ok(texts)
}

async fn completion_service(args: &Args, config: &GraphConfig) -> Result<Arc<dyn TextCompletion>> {
    if args.offline {
        info!("Offline mode, using fallback graph");
        return Ok(Arc::new(OfflineCompletion));
    }

    let client = OllamaClient::new(config)?;
    if args.check_model {
        client
            .verify_model()
            .await
            .with_context(|| format!("Model check failed for {}", client.model()))?;
    }
    Ok(Arc::new(client))
}

pub fn render(graph: &GraphResponse, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(graph)
    } else {
        serde_json::to_string(graph)
    };
    json.context("Failed to serialize graph")
}

/// Run the command
pub async fn run(args: Args) -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing(args.verbose);

    let config = args.resolve_config()?;
    let service = completion_service(&args, &config).await?;
    let texts = read_inputs(&args).await?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing with fallback graph");
            on_signal.cancel();
        }
    });

    let builder = GraphBuilder::new(service, &config);
    let graph = builder.build_graph_with_cancel(&texts, cancel).await;

    println!("{}", render(&graph, args.pretty)?);

    if let Some(warning) = &graph.warning {
        eprintln!("warning: {}", warning);
    }

    if args.plan {
        let plan = execution_batches(&graph);
        for (i, batch) in plan.batches.iter().enumerate() {
            eprintln!("batch {}: {}", i + 1, batch.join(", "));
        }
        if plan.cycle_detected {
            eprintln!("warning: circular dependency, last batch is unordered");
        }
    }

    Ok(())
}
