//! provider::echo
//!
//! Offline provider that answers every prompt with the prompt itself,
//! tagged with the model name. Useful for demos and for exercising the
//! ledger without a model installed.

use std::time::Duration;

use async_trait::async_trait;

use super::traits::{ModelProvider, ProviderError, ProviderRequest, ProviderResponse};

/// Deterministic echo provider.
#[derive(Debug, Clone, Default)]
pub struct EchoProvider {
    latency: Option<Duration>,
}

impl EchoProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl ModelProvider for EchoProvider {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn submit(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(ProviderResponse {
            output: format!("[{}] {}", request.model, request.prompt),
            duration_ms: Some(self.latency.map_or(0, |d| d.as_millis() as u64)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_prompt_with_model() {
        let provider = EchoProvider::new();
        let response = provider
            .submit(&ProviderRequest::new("line one\nline two", "llama-2-7b"))
            .await
            .unwrap();
        assert_eq!(response.output, "[llama-2-7b] line one\nline two");
        assert_eq!(response.duration_ms, Some(0));
    }

    #[tokio::test]
    async fn reports_latency() {
        let provider = EchoProvider::new().with_latency(Duration::from_millis(5));
        let response = provider
            .submit(&ProviderRequest::new("p", "m"))
            .await
            .unwrap();
        assert_eq!(response.duration_ms, Some(5));
    }
}
