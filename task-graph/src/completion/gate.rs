//! Request-scoped gate around every outbound completion call.
//!
//! The gate bounds concurrency with a semaphore, applies the per-call timeout,
//! observes the build's cancellation token and normalizes the response text.

use std::sync::Arc;
use std::time::Duration;
use task_graph_sdk::{CompletionError, CompletionRequest, TextCompletion};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::completion::strip_think_blocks;

pub struct CompletionGate {
    service: Arc<dyn TextCompletion>,
    permits: Semaphore,
    timeout: Duration,
    cancel: CancellationToken,
}

impl CompletionGate {
    pub fn new(
        service: Arc<dyn TextCompletion>,
        max_in_flight: usize,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            service,
            permits: Semaphore::new(max_in_flight.max(1)),
            timeout,
            cancel,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one request through the gate
    ///
    /// Returns the response with reasoning blocks removed. An empty response
    /// is reported as `InvalidResponse`.
    pub async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(CompletionError::Cancelled),
            permit = self.permits.acquire() => permit
                .map_err(|_| CompletionError::Unavailable("completion gate closed".to_string()))?,
        };

        debug!(
            prompt_len = request.prompt.len(),
            temperature = request.temperature,
            "Sending completion request"
        );

        let call = tokio::time::timeout(self.timeout, self.service.complete(request));
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(CompletionError::Cancelled),
            result = call => result,
        };

        let text = match result {
            Ok(Ok(text)) => strip_think_blocks(&text),
            Ok(Err(err)) => return Err(err),
            Err(_) => return Err(CompletionError::Timeout(self.timeout)),
        };

        if text.is_empty() {
            return Err(CompletionError::InvalidResponse("empty response".to_string()));
        }

        debug!(response = %text, "Received completion response");
        Ok(text)
    }
}
