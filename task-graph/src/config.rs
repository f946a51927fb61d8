//! Runtime configuration for graph building.
//!
//! Values are layered: built-in defaults, then a YAML file, then environment
//! variables (a `.env` file is honoured by the binary), then CLI flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Graph builder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Base URL of the Ollama server
    pub ollama_host: String,

    /// Model used for every completion
    pub model: String,

    /// Timeout applied to each completion call
    pub request_timeout_secs: u64,

    /// Worker pool size for per-task synthesis
    pub max_concurrent_tasks: usize,

    /// Outbound completion calls allowed in flight at once
    pub max_concurrent_requests: usize,

    /// Extra attempts for transient completion failures
    pub max_retries: u32,

    /// Generation length limit passed to the model
    pub max_tokens: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            ollama_host: "http://localhost:11434".to_string(),
            model: "deepseek-r1:1.5b".to_string(),
            request_timeout_secs: 60,
            max_concurrent_tasks: 4,
            max_concurrent_requests: 2,
            max_retries: 0,
            max_tokens: 1024,
        }
    }
}

pub const ENV_HOST: &str = "TASK_GRAPH_OLLAMA_HOST";
pub const ENV_MODEL: &str = "TASK_GRAPH_MODEL";
pub const ENV_TIMEOUT: &str = "TASK_GRAPH_TIMEOUT_SECS";
pub const ENV_MAX_TASKS: &str = "TASK_GRAPH_MAX_TASKS";
pub const ENV_MAX_REQUESTS: &str = "TASK_GRAPH_MAX_REQUESTS";
pub const ENV_MAX_RETRIES: &str = "TASK_GRAPH_MAX_RETRIES";

impl GraphConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Default config file location (`<config_dir>/task-graph/config.yaml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("task-graph").join("config.yaml"))
    }

    /// Resolve configuration from an explicit file, the default file if it
    /// exists, and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(default) => Self::from_file(&default)?,
                None => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config.normalized())
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.ollama_host = host;
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.model = model;
        }
        if let Some(value) = lookup(ENV_TIMEOUT) {
            self.request_timeout_secs = parse_env(ENV_TIMEOUT, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_TASKS) {
            self.max_concurrent_tasks = parse_env(ENV_MAX_TASKS, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_REQUESTS) {
            self.max_concurrent_requests = parse_env(ENV_MAX_REQUESTS, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_RETRIES) {
            self.max_retries = parse_env(ENV_MAX_RETRIES, &value)?;
        }
        Ok(())
    }

    /// Clamp values that would stall the pipeline
    pub fn normalized(mut self) -> Self {
        self.max_concurrent_tasks = self.max_concurrent_tasks.max(1);
        self.max_concurrent_requests = self.max_concurrent_requests.max(1);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        self.ollama_host = self.ollama_host.trim_end_matches('/').to_string();
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: {:?}", key, value))
}
