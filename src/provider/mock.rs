//! provider::mock
//!
//! Mock provider implementation for deterministic testing.
//!
//! # Design
//!
//! The mock answers from a table of scripted outputs keyed by prompt and
//! falls back to `"{model}: {prompt}"`. Failures can be scripted for every
//! call, for one model, or for one prompt. Every submission is recorded.
//!
//! # Example
//!
//! ```
//! use dusk::provider::mock::{FailOn, MockProvider};
//! use dusk::provider::{ModelProvider, ProviderError, ProviderRequest};
//!
//! # tokio_test::block_on(async {
//! let provider = MockProvider::new()
//!     .with_response("Explain React hooks", "Hooks are functions...")
//!     .fail_on(FailOn::Model("claude-3".into(), ProviderError::Failed("rate limited".into())));
//!
//! let ok = provider
//!     .submit(&ProviderRequest::new("Explain React hooks", "gpt-4"))
//!     .await
//!     .unwrap();
//! assert_eq!(ok.output, "Hooks are functions...");
//!
//! let err = provider
//!     .submit(&ProviderRequest::new("Explain React hooks", "claude-3"))
//!     .await
//!     .unwrap_err();
//! assert_eq!(err, ProviderError::Failed("rate limited".into()));
//! assert_eq!(provider.calls().len(), 2);
//! # });
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::traits::{ModelProvider, ProviderError, ProviderRequest, ProviderResponse};

/// Mock provider for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    inner: Arc<Mutex<MockProviderInner>>,
}

#[derive(Debug, Default)]
struct MockProviderInner {
    /// Scripted outputs by prompt.
    responses: HashMap<String, String>,
    /// Scripted failures, checked in order.
    fail_on: Vec<FailOn>,
    /// Delay before answering.
    delay: Option<Duration>,
    /// Recorded submissions.
    calls: Vec<ProviderRequest>,
    /// Calls currently inside `submit`.
    in_flight: usize,
    /// Highest `in_flight` observed.
    max_in_flight: usize,
}

/// Which submissions should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail every call.
    Always(ProviderError),
    /// Fail calls for the given model.
    Model(String, ProviderError),
    /// Fail calls with the given prompt.
    Prompt(String, ProviderError),
}

impl FailOn {
    fn matches(&self, request: &ProviderRequest) -> Option<&ProviderError> {
        match self {
            FailOn::Always(e) => Some(e),
            FailOn::Model(model, e) if model == &request.model => Some(e),
            FailOn::Prompt(prompt, e) if prompt == &request.prompt => Some(e),
            _ => None,
        }
    }
}

impl MockProvider {
    /// Create a mock with no scripted behavior.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `prompt` with `output`.
    pub fn with_response(self, prompt: impl Into<String>, output: impl Into<String>) -> Self {
        self.inner
            .lock()
            .responses
            .insert(prompt.into(), output.into());
        self
    }

    /// Sleep before answering every call.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.inner.lock().delay = Some(delay);
        self
    }

    /// Add a failure rule.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.inner.lock().fail_on.push(fail_on);
        self
    }

    /// Clear the failure rules.
    pub fn clear_fail_on(&self) {
        self.inner.lock().fail_on.clear();
    }

    /// Get all recorded submissions.
    pub fn calls(&self) -> Vec<ProviderRequest> {
        self.inner.lock().calls.clone()
    }

    /// Highest number of concurrent submissions seen.
    pub fn max_in_flight(&self) -> usize {
        self.inner.lock().max_in_flight
    }

    fn begin(
        &self,
        request: &ProviderRequest,
    ) -> (Option<Duration>, Result<String, ProviderError>) {
        let mut inner = self.inner.lock();
        inner.calls.push(request.clone());
        inner.in_flight += 1;
        inner.max_in_flight = inner.max_in_flight.max(inner.in_flight);

        let result = match inner.fail_on.iter().find_map(|f| f.matches(request)) {
            Some(e) => Err(e.clone()),
            None => Ok(inner
                .responses
                .get(&request.prompt)
                .cloned()
                .unwrap_or_else(|| format!("{}: {}", request.model, request.prompt))),
        };
        (inner.delay, result)
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn submit(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let (delay, result) = self.begin(request);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.lock().in_flight -= 1;

        result.map(|output| ProviderResponse {
            output,
            duration_ms: Some(delay.map_or(1, |d| d.as_millis() as u64)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_output() {
        let provider = MockProvider::new();
        let response = provider
            .submit(&ProviderRequest::new("hi", "gpt-4"))
            .await
            .unwrap();
        assert_eq!(response.output, "gpt-4: hi");
    }

    #[tokio::test]
    async fn prompt_failure_rule() {
        let provider = MockProvider::new().fail_on(FailOn::Prompt(
            "bad".into(),
            ProviderError::Unavailable("down".into()),
        ));
        assert!(provider
            .submit(&ProviderRequest::new("good", "m"))
            .await
            .is_ok());
        assert!(provider
            .submit(&ProviderRequest::new("bad", "m"))
            .await
            .is_err());

        provider.clear_fail_on();
        assert!(provider
            .submit(&ProviderRequest::new("bad", "m"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn clones_share_recordings() {
        let provider = MockProvider::new();
        let handle = provider.clone();
        provider
            .submit(&ProviderRequest::new("a", "m"))
            .await
            .unwrap();
        assert_eq!(handle.calls(), vec![ProviderRequest::new("a", "m")]);
        assert_eq!(handle.max_in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_calls_overlap() {
        let provider = MockProvider::new().with_delay(Duration::from_secs(1));
        let a = provider.clone();
        let b = provider.clone();
        let (ra, rb) = tokio::join!(
            async move { a.submit(&ProviderRequest::new("a", "m")).await },
            async move { b.submit(&ProviderRequest::new("b", "m")).await },
        );
        assert!(ra.is_ok() && rb.is_ok());
        assert_eq!(provider.max_in_flight(), 2);
        assert_eq!(ra.unwrap().duration_ms, Some(1000));
    }
}
