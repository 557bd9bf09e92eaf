//! engine
//!
//! The intent surface of dusk: every user-facing operation goes through
//! [`Engine`].
//!
//! # Architecture
//!
//! ```text
//! cli -> Engine -> Coordinator -> ModelProvider
//!           |           |
//!           +-----> RunStore <-> LineageGraph
//! ```
//!
//! - Read intents (`list_runs`, `get_run`, `render_lineage`, ...) work on
//!   store snapshots and never wait for in-flight provider calls
//! - Write intents go through the store, which serializes them
//! - Execution intents (`submit_run`, `retry_run`, `branch_run`) return a
//!   [`PendingRun`] handle
//!
//! Every intent returns a value or a [`LedgerError`]; exit codes are the
//! CLI's concern.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use dusk::core::ledger::RunStore;
//! use dusk::core::types::{BranchName, RunStatus};
//! use dusk::engine::Engine;
//! use dusk::provider::mock::MockProvider;
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(RunStore::in_memory(BranchName::new("main").unwrap()));
//! let engine = Engine::new(store, Arc::new(MockProvider::new()), "gpt-4");
//!
//! let run = engine.submit_run("explain X", None).await.unwrap().wait().await.unwrap();
//! assert_eq!(run.status, RunStatus::Success);
//! assert_eq!(run.model, "gpt-4");
//! # });
//! ```

pub mod coordinator;
pub mod explain;

pub use coordinator::{Coordinator, PendingRun, RunOverrides};
pub use explain::Explanation;

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::compare::{self, CompareMode, ComparisonResult};
use crate::core::config::{Config, ConfigError};
use crate::core::graph::RenderFormat;
use crate::core::ledger::{Branch, LedgerError, Run, RunFilter, RunStore};
use crate::core::paths::DuskPaths;
use crate::core::types::{BranchName, RunId};
use crate::provider::{create_provider, ModelProvider, ProviderError};

/// Execution context for commands.
///
/// Contains global settings derived from CLI flags that affect command behavior.
#[derive(Debug, Clone)]
pub struct Context {
    /// Data directory override.
    pub data_dir: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
    /// Interactive mode enabled.
    pub interactive: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            data_dir: None,
            debug: false,
            quiet: false,
            interactive: true,
        }
    }
}

/// Errors from assembling an engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("no data directory: pass --data-dir, set DUSK_DATA_DIR, or configure data_dir")]
    NoDataDir,
}

/// The intent surface over a store and a provider.
#[derive(Debug, Clone)]
pub struct Engine {
    store: Arc<RunStore>,
    coordinator: Coordinator,
    default_model: String,
}

impl Engine {
    pub fn new(
        store: Arc<RunStore>,
        provider: Arc<dyn ModelProvider>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            coordinator: Coordinator::new(Arc::clone(&store), provider),
            store,
            default_model: default_model.into(),
        }
    }

    /// Open the file-backed ledger and configured provider.
    ///
    /// # Errors
    ///
    /// Fails if no data directory can be determined, the ledger is locked or
    /// corrupt, or the provider is misconfigured.
    pub fn open(ctx: &Context, config: &Config) -> Result<Self, EngineError> {
        let paths = DuskPaths::resolve(ctx.data_dir.as_deref(), config.data_dir())
            .ok_or(EngineError::NoDataDir)?;
        let provider = create_provider(config)?;
        tracing::debug!(data_dir = %paths.data_dir.display(), "opening ledger");
        let store = RunStore::open(paths, config.default_branch()?)?;
        Ok(Self::new(Arc::new(store), provider, config.default_model()))
    }

    pub fn store(&self) -> &Arc<RunStore> {
        &self.store
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Resolve a full id or unique prefix.
    pub fn resolve(&self, query: &str) -> Result<RunId, LedgerError> {
        self.store.resolve(query)
    }

    /// Submit a new root run, using the default model when `model` is `None`.
    pub async fn submit_run(
        &self,
        prompt: &str,
        model: Option<&str>,
    ) -> Result<PendingRun, LedgerError> {
        let model = model.unwrap_or(&self.default_model);
        self.coordinator.run(prompt, model).await
    }

    /// Retry a run on its own branch.
    pub async fn retry_run(
        &self,
        source: &RunId,
        overrides: &RunOverrides,
    ) -> Result<PendingRun, LedgerError> {
        self.coordinator.retry(source, overrides).await
    }

    /// Branch from a run under a new name.
    pub async fn branch_run(
        &self,
        source: &RunId,
        name: BranchName,
        overrides: &RunOverrides,
    ) -> Result<PendingRun, LedgerError> {
        self.coordinator.branch(source, name, overrides).await
    }

    pub fn list_runs(&self, filter: &RunFilter, limit: Option<usize>) -> Vec<Run> {
        self.store.list(filter, limit)
    }

    pub fn get_run(&self, id: &RunId) -> Result<Run, LedgerError> {
        self.store.get(id)
    }

    pub fn delete_run(&self, id: &RunId, cascade: bool) -> Result<Vec<RunId>, LedgerError> {
        self.store.delete(id, cascade)
    }

    pub fn delete_branch(&self, name: &BranchName) -> Result<Vec<RunId>, LedgerError> {
        self.store.delete_branch(name)
    }

    pub fn branches(&self) -> Vec<Branch> {
        self.store.branches()
    }

    pub fn compare_runs(
        &self,
        left: &RunId,
        right: &RunId,
        mode: CompareMode,
    ) -> Result<ComparisonResult, LedgerError> {
        compare::compare(&self.store, left, right, mode)
    }

    pub fn render_lineage(&self, format: RenderFormat) -> String {
        self.store.graph().render(format)
    }

    pub fn explain_run(&self, id: &RunId) -> Result<Explanation, LedgerError> {
        Explanation::build(&self.store.graph(), id)
    }
}
