//! engine::coordinator
//!
//! Turns run, retry and branch intents into settled runs.
//!
//! # Lifecycle
//!
//! ```text
//! validate -> create Pending -> spawn provider call -> settle Success|Failed
//! ```
//!
//! The pending run is recorded before the provider is called, so the ledger
//! shows in-flight work. Each run gets exactly one spawned task, which owns
//! its settlement. The caller receives a [`PendingRun`] and may await it,
//! await it with a timeout, or drop it; dropping only abandons the wait.
//!
//! Provider errors never surface as `Err` from the coordinator. They settle
//! the run as `Failed` with the error text as output.
//!
//! If the ledger cannot record the outcome, settlement is attempted once more
//! as `Failed` carrying the storage error. Only when that second write fails
//! too does the run stay `Pending`, and the error goes to whoever is waiting.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use crate::core::ledger::{LedgerError, Run, RunDraft, RunPatch, RunStore};
use crate::core::types::{BranchName, RunId};
use crate::provider::{ModelProvider, ProviderRequest};

/// Overrides applied when deriving a run from an existing one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOverrides {
    /// Use this model instead of the source's
    pub model: Option<String>,
    /// Use this prompt instead of the source's
    pub prompt: Option<String>,
    /// Force the source's model; conflicts with `model`
    pub same_model: bool,
}

impl RunOverrides {
    pub fn model(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            ..Default::default()
        }
    }

    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Default::default()
        }
    }

    fn apply(&self, source: &Run) -> Result<(String, String), LedgerError> {
        if self.same_model && self.model.is_some() {
            return Err(LedgerError::InvalidInput(
                "--same cannot be combined with a model override".into(),
            ));
        }
        let prompt = self.prompt.clone().unwrap_or_else(|| source.prompt.clone());
        let model = match (&self.model, self.same_model) {
            (Some(model), false) => model.clone(),
            _ => source.model.clone(),
        };
        Ok((prompt, model))
    }
}

/// Handle to a run whose provider call is in flight.
#[derive(Debug)]
pub struct PendingRun {
    run: Run,
    store: Arc<RunStore>,
    handle: JoinHandle<Result<Run, LedgerError>>,
}

impl PendingRun {
    /// Id of the pending run.
    pub fn id(&self) -> &RunId {
        &self.run.id
    }

    /// The run as recorded before the provider call.
    pub fn pending(&self) -> &Run {
        &self.run
    }

    /// Wait for the run to settle.
    pub async fn wait(self) -> Result<Run, LedgerError> {
        let id = self.run.id.clone();
        Self::join(self.handle, &self.store, &id).await
    }

    /// Wait up to `limit` for the run to settle.
    ///
    /// Returns `Ok(None)` if it is still in flight; the handle stays usable
    /// and the call keeps running.
    pub async fn wait_for(&mut self, limit: Duration) -> Result<Option<Run>, LedgerError> {
        match tokio::time::timeout(limit, &mut self.handle).await {
            Ok(joined) => Self::settled(joined, &self.store, &self.run.id).map(Some),
            Err(_) => Ok(None),
        }
    }

    async fn join(
        handle: JoinHandle<Result<Run, LedgerError>>,
        store: &RunStore,
        id: &RunId,
    ) -> Result<Run, LedgerError> {
        Self::settled(handle.await, store, id)
    }

    fn settled(
        joined: Result<Result<Run, LedgerError>, tokio::task::JoinError>,
        store: &RunStore,
        id: &RunId,
    ) -> Result<Run, LedgerError> {
        match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => store.get(id),
        }
    }
}

/// Executes intents against a store and a provider.
#[derive(Clone)]
pub struct Coordinator {
    store: Arc<RunStore>,
    provider: Arc<dyn ModelProvider>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl Coordinator {
    pub fn new(store: Arc<RunStore>, provider: Arc<dyn ModelProvider>) -> Self {
        Self { store, provider }
    }

    pub fn store(&self) -> &Arc<RunStore> {
        &self.store
    }

    /// Start a root run.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidInput`] for an empty prompt or model
    pub async fn run(&self, prompt: &str, model: &str) -> Result<PendingRun, LedgerError> {
        let run = self.store.create(RunDraft::root(prompt, model))?;
        Ok(self.submit(run))
    }

    /// Start a same-branch child of `source`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] if `source` is unknown
    /// - [`LedgerError::InvalidInput`] for conflicting overrides
    pub async fn retry(
        &self,
        source: &RunId,
        overrides: &RunOverrides,
    ) -> Result<PendingRun, LedgerError> {
        let source = self.store.get(source)?;
        let (prompt, model) = overrides.apply(&source)?;
        let run = self
            .store
            .create(RunDraft::child(source.id.clone(), prompt, model))?;
        Ok(self.submit(run))
    }

    /// Start a new named branch from `source`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] if `source` is unknown
    /// - [`LedgerError::DuplicateBranch`] if `name` exists
    pub async fn branch(
        &self,
        source: &RunId,
        name: BranchName,
        overrides: &RunOverrides,
    ) -> Result<PendingRun, LedgerError> {
        let source = self.store.get(source)?;
        let (prompt, model) = overrides.apply(&source)?;
        let run = self
            .store
            .create(RunDraft::child(source.id.clone(), prompt, model).on_branch(name))?;
        Ok(self.submit(run))
    }

    fn submit(&self, run: Run) -> PendingRun {
        tracing::debug!(
            run = %run.id,
            model = %run.model,
            provider = self.provider.name(),
            "submitting run"
        );
        let handle = tokio::spawn(settle(
            Arc::clone(&self.store),
            Arc::clone(&self.provider),
            run.clone(),
        ));
        PendingRun {
            run,
            store: Arc::clone(&self.store),
            handle,
        }
    }
}

async fn settle(
    store: Arc<RunStore>,
    provider: Arc<dyn ModelProvider>,
    run: Run,
) -> Result<Run, LedgerError> {
    let request = ProviderRequest::new(run.prompt.as_str(), run.model.as_str());
    let started = Instant::now();
    let result = provider.submit(&request).await;
    let elapsed = started.elapsed().as_millis() as u64;

    let patch = match result {
        Ok(response) => {
            RunPatch::success(response.output, response.duration_ms.unwrap_or(elapsed))
        }
        Err(e) => {
            tracing::warn!(run = %run.id, error = %e, "provider call failed");
            RunPatch::failed(e.to_string(), Some(elapsed))
        }
    };

    match store.update(&run.id, patch) {
        Err(LedgerError::Storage(e)) => {
            tracing::error!(run = %run.id, error = %e, "failed to record run outcome");
            let message = format!("failed to record result: {e}");
            store.update(&run.id, RunPatch::failed(message, Some(elapsed))).map_err(|retry| {
                tracing::error!(run = %run.id, error = %retry, "run left pending");
                retry
            })
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::MemoryStorage;
    use crate::core::types::RunStatus;
    use crate::provider::mock::{FailOn, MockProvider};
    use crate::provider::ProviderError;

    fn coordinator(provider: MockProvider) -> Coordinator {
        let store = Arc::new(RunStore::in_memory(BranchName::new("main").unwrap()));
        Coordinator::new(store, Arc::new(provider))
    }

    #[tokio::test]
    async fn run_settles_success() {
        let coordinator = coordinator(MockProvider::new().with_response("explain X", "X is ..."));
        let pending = coordinator.run("explain X", "gpt-4").await.unwrap();
        assert_eq!(pending.pending().status, RunStatus::Pending);

        let run = pending.wait().await.unwrap();
        assert_eq!(run.status, RunStatus::Success);
        assert_eq!(run.output.as_deref(), Some("X is ..."));
        assert!(run.parent_id.is_none());
        assert_eq!(coordinator.store().get(&run.id).unwrap(), run);
    }

    #[tokio::test]
    async fn provider_failure_recorded_on_run() {
        let provider = MockProvider::new().fail_on(FailOn::Always(ProviderError::Timeout(
            Duration::from_secs(30),
        )));
        let coordinator = coordinator(provider);
        let run = coordinator
            .run("p", "gpt-4")
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.output.as_deref(), Some("provider timed out after 30s"));
    }

    #[tokio::test]
    async fn empty_prompt_rejected_before_provider() {
        let provider = MockProvider::new();
        let coordinator = coordinator(provider.clone());
        let err = coordinator.run("", "gpt-4").await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
        assert!(provider.calls().is_empty());
        assert!(coordinator.store().is_empty());
    }

    #[tokio::test]
    async fn retry_inherits_and_overrides() {
        let provider = MockProvider::new();
        let coordinator = coordinator(provider.clone());
        let source = coordinator
            .run("p", "gpt-3.5-turbo")
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        let same = coordinator
            .retry(&source.id, &RunOverrides::default())
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();
        assert_eq!(same.parent_id.as_ref(), Some(&source.id));
        assert_eq!(same.model, "gpt-3.5-turbo");
        assert!(same.branch_name.is_none());

        let other = coordinator
            .retry(&source.id, &RunOverrides::model("gpt-4"))
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();
        assert_eq!(other.model, "gpt-4");
        assert_eq!(other.prompt, "p");
        assert_eq!(provider.calls().len(), 3);
    }

    #[tokio::test]
    async fn retry_conflicting_overrides() {
        let coordinator = coordinator(MockProvider::new());
        let source = coordinator.run("p", "m").await.unwrap().wait().await.unwrap();
        let overrides = RunOverrides {
            model: Some("gpt-4".into()),
            same_model: true,
            ..Default::default()
        };
        assert!(matches!(
            coordinator.retry(&source.id, &overrides).await,
            Err(LedgerError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn retry_missing_source() {
        let coordinator = coordinator(MockProvider::new());
        assert!(matches!(
            coordinator
                .retry(&RunId::generate(), &RunOverrides::default())
                .await,
            Err(LedgerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn branch_names_new_path() {
        let coordinator = coordinator(MockProvider::new());
        let source = coordinator.run("p", "m").await.unwrap().wait().await.unwrap();
        let name = BranchName::new("experiment-1").unwrap();

        let branched = coordinator
            .branch(&source.id, name.clone(), &RunOverrides::prompt("p2"))
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();
        assert_eq!(branched.branch_name.as_ref(), Some(&name));
        assert_eq!(branched.prompt, "p2");

        assert!(matches!(
            coordinator
                .branch(&source.id, name, &RunOverrides::default())
                .await,
            Err(LedgerError::DuplicateBranch(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_wait_still_settles() {
        let coordinator =
            coordinator(MockProvider::new().with_delay(Duration::from_secs(5)));
        let mut pending = coordinator.run("slow", "m").await.unwrap();
        let id = pending.id().clone();

        assert!(pending
            .wait_for(Duration::from_millis(10))
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            coordinator.store().get(&id).unwrap().status,
            RunStatus::Pending
        );
        drop(pending);

        tokio::time::sleep(Duration::from_secs(10)).await;
        // Let the settlement task observe its timer.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            coordinator.store().get(&id).unwrap().status,
            RunStatus::Success
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unrecorded_outcome_settles_as_failed() {
        let storage = MemoryStorage::new();
        let store = RunStore::with_storage(
            Box::new(storage.clone()),
            BranchName::new("main").unwrap(),
        )
        .unwrap();
        let coordinator = Coordinator::new(
            Arc::new(store),
            Arc::new(MockProvider::new().with_delay(Duration::from_secs(1))),
        );

        let pending = coordinator.run("p", "m").await.unwrap();
        let id = pending.id().clone();
        storage.fail_next_writes(1);

        let run = pending.wait().await.unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert!(run.output.unwrap().contains("injected write failure"));
        assert_eq!(
            coordinator.store().get(&id).unwrap().status,
            RunStatus::Failed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn second_write_failure_leaves_run_pending() {
        let storage = MemoryStorage::new();
        let store = RunStore::with_storage(
            Box::new(storage.clone()),
            BranchName::new("main").unwrap(),
        )
        .unwrap();
        let coordinator = Coordinator::new(
            Arc::new(store),
            Arc::new(MockProvider::new().with_delay(Duration::from_secs(1))),
        );

        let pending = coordinator.run("p", "m").await.unwrap();
        let id = pending.id().clone();
        storage.fail_next_writes(2);

        assert!(matches!(pending.wait().await, Err(LedgerError::Storage(_))));
        assert_eq!(
            coordinator.store().get(&id).unwrap().status,
            RunStatus::Pending
        );
    }

    #[tokio::test(start_paused = true)]
    async fn runs_proceed_independently() {
        let provider = MockProvider::new().with_delay(Duration::from_secs(1));
        let coordinator = coordinator(provider.clone());
        let a = coordinator.run("a", "m").await.unwrap();
        let b = coordinator.run("b", "m").await.unwrap();

        // Reads are not blocked by in-flight calls.
        assert_eq!(coordinator.store().len(), 2);

        let (ra, rb) = tokio::join!(a.wait(), b.wait());
        assert_eq!(ra.unwrap().status, RunStatus::Success);
        assert_eq!(rb.unwrap().status, RunStatus::Success);
        assert_eq!(provider.max_in_flight(), 2);
    }
}
