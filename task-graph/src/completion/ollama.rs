//! Ollama-backed text completion (`/api/generate`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use task_graph_sdk::{async_trait, CompletionError, CompletionRequest, TextCompletion};
use tracing::{debug, info};

use crate::completion::strip_think_blocks;
use crate::config::GraphConfig;

const NO_REASONING: &str =
    "DO NOT include any thinking, reasoning process, or explanations unless asked.";

/// System instruction sent with every request
pub fn enhanced_system_prompt(system_prompt: Option<&str>) -> String {
    match system_prompt {
        Some(system) => format!("{}\n{}", system.trim_end(), NO_REASONING),
        None => format!("Respond concisely and directly. {}", NO_REASONING),
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    #[serde(default)]
    name: String,
    #[serde(default)]
    model: String,
}

/// HTTP client for a local or remote Ollama server
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    host: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(config: &GraphConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client for Ollama")?;

        Ok(Self {
            http,
            host: config.ollama_host.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout: config.request_timeout(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check that the configured model is installed on the server
    pub async fn verify_model(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.host);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach Ollama at {}", self.host))?;

        if !response.status().is_success() {
            anyhow::bail!("Ollama API error {} listing models", response.status());
        }

        let tags: TagsResponse = response
            .json()
            .await
            .context("Failed to decode Ollama model list")?;

        if has_model(&tags.models, &self.model) {
            info!(model = %self.model, "Connected to Ollama");
            Ok(())
        } else {
            anyhow::bail!("Model {} not found in Ollama at {}", self.model, self.host)
        }
    }

    fn map_error(&self, err: reqwest::Error) -> CompletionError {
        if err.is_timeout() {
            CompletionError::Timeout(self.timeout)
        } else if err.is_decode() {
            CompletionError::InvalidResponse(err.to_string())
        } else {
            CompletionError::Unavailable(err.to_string())
        }
    }
}

fn has_model(models: &[ModelTag], wanted: &str) -> bool {
    let tagged = format!("{}:latest", wanted);
    models
        .iter()
        .any(|m| [m.name.as_str(), m.model.as_str()].iter().any(|n| *n == wanted || *n == tagged))
}

#[async_trait]
impl TextCompletion for OllamaClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            system: enhanced_system_prompt(request.system_prompt.as_deref()),
            stream: false,
            options: GenerateOptions {
                temperature: request.temperature,
                top_p: 0.9,
                top_k: 40,
                num_predict: self.max_tokens,
            },
        };

        let url = format!("{}/api/generate", self.host);
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CompletionError::Unavailable(format!(
                "Ollama API error {}: {}",
                status, error_text
            )));
        }

        let generated: GenerateResponse = response.json().await.map_err(|e| self.map_error(e))?;
        debug!(model = %self.model, chars = generated.response.len(), "Ollama generation complete");

        Ok(strip_think_blocks(&generated.response))
    }
}
