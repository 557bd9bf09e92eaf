//! provider::traits
//!
//! Provider trait definition for submitting prompts to a model.
//!
//! # Design
//!
//! The `ModelProvider` trait is async because provider calls involve process
//! or network I/O. A provider enforces its own timeout and reports it as
//! [`ProviderError::Timeout`].

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from provider calls.
///
/// The coordinator stores the display form of these errors as the failed
/// run's output.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The call did not finish in time.
    #[error("provider timed out after {0:?}")]
    Timeout(Duration),

    /// The provider could not be reached or started.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider does not serve the requested model.
    #[error("model not supported by provider: {0}")]
    ModelUnsupported(String),

    /// The provider ran and reported an error.
    #[error("provider call failed: {0}")]
    Failed(String),
}

/// One prompt submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRequest {
    pub prompt: String,
    pub model: String,
}

impl ProviderRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
        }
    }
}

/// Successful provider result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    /// Model output text
    pub output: String,
    /// Provider-reported latency; the coordinator measures wall time when absent
    pub duration_ms: Option<u64>,
}

impl ProviderResponse {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            duration_ms: None,
        }
    }
}

/// The ModelProvider trait for submitting prompts.
///
/// Implementations must be `Send + Sync` so the coordinator can call them
/// from spawned tasks.
///
/// # Example
///
/// ```
/// use dusk::provider::{ModelProvider, ProviderError, ProviderRequest};
///
/// async fn ask(provider: &dyn ModelProvider) -> Result<String, ProviderError> {
///     let response = provider
///         .submit(&ProviderRequest::new("Explain React hooks", "gpt-4"))
///         .await?;
///     Ok(response.output)
/// }
/// ```
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Get the provider name (e.g., "command", "echo").
    fn name(&self) -> &'static str;

    /// Submit a prompt and wait for the model's output.
    ///
    /// # Errors
    ///
    /// - `Timeout` if the call exceeds the provider's limit
    /// - `Unavailable` if the provider cannot be started or reached
    /// - `ModelUnsupported` if the model is not served
    /// - `Failed` for any other provider-side error
    async fn submit(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display() {
        assert_eq!(
            ProviderError::Timeout(Duration::from_secs(30)).to_string(),
            "provider timed out after 30s"
        );
        assert_eq!(
            ProviderError::ModelUnsupported("gpt-9".into()).to_string(),
            "model not supported by provider: gpt-9"
        );
        assert!(ProviderError::Failed("boom".into())
            .to_string()
            .contains("boom"));
    }

    #[test]
    fn request_new() {
        let request = ProviderRequest::new("p", "m");
        assert_eq!(request.prompt, "p");
        assert_eq!(request.model, "m");
    }
}
