//! core::ledger
//!
//! The run ledger: durable run records, the branch index, and the error
//! taxonomy shared by every ledger operation.
//!
//! # Modules
//!
//! - [`schema`] - Run, branch and on-disk record types
//! - [`storage`] - Durable backends (file, memory)
//! - [`store`] - The run record store
//!
//! # Example
//!
//! ```
//! use dusk::core::ledger::{RunDraft, RunPatch, RunStore};
//! use dusk::core::types::{BranchName, RunStatus};
//!
//! let store = RunStore::in_memory(BranchName::new("main").unwrap());
//!
//! let run = store.create(RunDraft::root("explain X", "gpt-4")).unwrap();
//! assert_eq!(run.status, RunStatus::Pending);
//!
//! let run = store.update(&run.id, RunPatch::success("X is ...", 2300)).unwrap();
//! assert_eq!(run.status, RunStatus::Success);
//! assert_eq!(run.duration_ms, Some(2300));
//! ```

pub mod schema;
pub mod storage;
pub mod store;

pub use schema::{Branch, Run, RunDraft, RunFilter, RunPatch};
pub use storage::{FileStorage, MemoryStorage, RunStorage, StorageError};
pub use store::RunStore;

use thiserror::Error;

use crate::core::types::{BranchName, RunId, RunStatus, TypeError};

/// Errors from ledger operations.
///
/// Every variant is a structural or validation error surfaced to the caller
/// of the operation that detected it. Provider failures are not part of this
/// taxonomy: they are recorded on the run itself.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("run not found: {0}")]
    NotFound(String),

    #[error("branch not found: {0}")]
    BranchNotFound(String),

    #[error("parent run does not exist: {0}")]
    InvalidParent(RunId),

    #[error("run {id} is already {from}; cannot move it to {to}")]
    InvalidTransition {
        id: RunId,
        from: RunStatus,
        to: RunStatus,
    },

    #[error("branch already exists: {0}")]
    DuplicateBranch(BranchName),

    #[error("run {id} has {children} child run(s); use cascade to delete them too")]
    HasChildren { id: RunId, children: usize },

    #[error("run {id} is {status}; only successful runs can be compared")]
    NotComparable { id: RunId, status: RunStatus },

    #[error("run id prefix '{prefix}' is ambiguous ({matches} runs match)")]
    AmbiguousId { prefix: String, matches: usize },

    #[error("the default branch '{0}' cannot be deleted")]
    DefaultBranch(BranchName),

    #[error("default branch '{0}' collides with a named branch in this ledger")]
    DefaultBranchConflict(BranchName),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl LedgerError {
    /// Whether this error means the requested run or branch does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound(_) | LedgerError::BranchNotFound(_))
    }
}

impl From<TypeError> for LedgerError {
    fn from(e: TypeError) -> Self {
        LedgerError::InvalidInput(e.to_string())
    }
}
