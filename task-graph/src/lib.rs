//! Build dependency graphs of tasks from free-form text.
//!
//! Text is segmented into tasks, each task becomes a titled node (with
//! research resources when it calls for them), and a single completion call
//! proposes dependencies between tasks. Every AI-assisted step has a
//! deterministic fallback, so a graph is always produced.

pub mod analyzer;
pub mod assembler;
pub mod cli;
pub mod completion;
pub mod config;
pub mod error;
pub mod fallback;
pub mod pipeline;
pub mod plan;
pub mod segmenter;
pub mod synthesizer;
pub mod util;

pub use config::GraphConfig;
pub use error::GraphIssue;
pub use pipeline::GraphBuilder;
pub use task_graph_sdk::{GraphResponse, TextCompletion};
