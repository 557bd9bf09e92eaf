//! core::ledger::storage
//!
//! Durable backends for the run store.
//!
//! # Design
//!
//! The `RunStorage` trait is a small keyed interface: one record per run plus
//! the branch index. The store keeps its own in-memory state and calls the
//! backend on every mutation, before committing the change in memory, so a
//! failed write leaves the store unchanged.
//!
//! # Backends
//!
//! - [`FileStorage`] - JSON files under the data directory, atomic writes,
//!   exclusive lock held for the backend's lifetime
//! - [`MemoryStorage`] - in-process maps, for tests and ephemeral use

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use super::schema::{
    parse_branch_index, parse_run_record, Branch, BranchIndexV1, Run, RunRecordV1, SchemaError,
};
use crate::core::lock::{LedgerLock, LockError};
use crate::core::paths::DuskPaths;
use crate::core::types::RunId;

/// Errors from storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("i/o error at '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize record: {0}")]
    Serialize(String),

    #[error("invalid record '{path}': {source}")]
    Schema { path: PathBuf, source: SchemaError },

    #[error("ledger is corrupt: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Everything a backend holds, as loaded at open time.
#[derive(Debug, Clone, Default)]
pub struct StoredLedger {
    pub runs: Vec<Run>,
    pub branches: Vec<Branch>,
}

/// Keyed storage of run records and the branch index.
///
/// Implementations must be thread-safe (Send + Sync). Writes must be durable
/// when they return `Ok`.
pub trait RunStorage: Send + Sync {
    /// Short backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// Load every stored run and the branch index.
    fn load(&self) -> Result<StoredLedger, StorageError>;

    /// Insert or replace a run record.
    fn put_run(&self, run: &Run) -> Result<(), StorageError>;

    /// Remove a run record. Removing a missing record is not an error.
    fn remove_run(&self, id: &RunId) -> Result<(), StorageError>;

    /// Replace the branch index.
    fn put_branches(&self, branches: &[Branch]) -> Result<(), StorageError>;
}

/// JSON-file backend rooted at a data directory.
///
/// Layout is defined by [`DuskPaths`]. The backend holds a [`LedgerLock`] so
/// no other process can open the same directory while it is alive.
#[derive(Debug)]
pub struct FileStorage {
    paths: DuskPaths,
    _lock: LedgerLock,
}

impl FileStorage {
    /// Open (creating if needed) the data directory and take its lock.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Lock` if another process holds the ledger.
    pub fn open(paths: DuskPaths) -> Result<Self, StorageError> {
        let lock = LedgerLock::acquire(&paths)?;
        let runs_dir = paths.runs_dir();
        fs::create_dir_all(&runs_dir).map_err(|e| io_error(&runs_dir, e))?;
        Ok(Self { paths, _lock: lock })
    }

    /// Paths used by this backend.
    pub fn paths(&self) -> &DuskPaths {
        &self.paths
    }

    fn read_runs(&self) -> Result<Vec<Run>, StorageError> {
        let dir = self.paths.runs_dir();
        let entries = fs::read_dir(&dir).map_err(|e| io_error(&dir, e))?;

        let mut runs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_error(&dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
            let run = parse_run_record(&content).map_err(|source| StorageError::Schema {
                path: path.clone(),
                source,
            })?;

            if path.file_stem().and_then(|s| s.to_str()) != Some(run.id.as_str()) {
                return Err(StorageError::Corrupt(format!(
                    "record '{}' holds run {}",
                    path.display(),
                    run.id
                )));
            }
            runs.push(run);
        }
        Ok(runs)
    }

    fn read_branches(&self) -> Result<Vec<Branch>, StorageError> {
        let path = self.paths.branches_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
        parse_branch_index(&content).map_err(|source| StorageError::Schema { path, source })
    }
}

impl RunStorage for FileStorage {
    fn name(&self) -> &'static str {
        "file"
    }

    fn load(&self) -> Result<StoredLedger, StorageError> {
        Ok(StoredLedger {
            runs: self.read_runs()?,
            branches: self.read_branches()?,
        })
    }

    fn put_run(&self, run: &Run) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(&RunRecordV1::new(run.clone()))
            .map_err(|e| StorageError::Serialize(e.to_string()))?;
        write_atomic(&self.paths.run_path(&run.id), content.as_bytes())
    }

    fn remove_run(&self, id: &RunId) -> Result<(), StorageError> {
        let path = self.paths.run_path(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    fn put_branches(&self, branches: &[Branch]) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(&BranchIndexV1::new(branches.to_vec()))
            .map_err(|e| StorageError::Serialize(e.to_string()))?;
        write_atomic(&self.paths.branches_path(), content.as_bytes())
    }
}

/// Write to a temp file in the same directory, fsync, then rename over `path`.
fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StorageError> {
    let temp_path = path.with_extension("json.tmp");

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| io_error(&temp_path, e))?;
    file.write_all(content)
        .map_err(|e| io_error(&temp_path, e))?;
    file.sync_all().map_err(|e| io_error(&temp_path, e))?;

    fs::rename(&temp_path, path).map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// In-memory backend.
///
/// Clones share the same state, so a test can keep a handle for fault
/// injection after boxing the backend into a store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    runs: BTreeMap<RunId, Run>,
    branches: Vec<Branch>,
    /// Let this many writes through before failing (for error-path tests).
    pass_writes: usize,
    /// Fail the next N writes (for error-path tests).
    fail_writes: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` writes fail with an I/O error.
    pub fn fail_next_writes(&self, n: usize) {
        self.fail_writes_after(0, n);
    }

    /// Let `skip` writes succeed, then fail the `n` after them.
    pub fn fail_writes_after(&self, skip: usize, n: usize) {
        let mut inner = self.inner.lock();
        inner.pass_writes = skip;
        inner.fail_writes = n;
    }

    fn check_fail(inner: &mut MemoryInner) -> Result<(), StorageError> {
        if inner.pass_writes > 0 {
            inner.pass_writes -= 1;
            return Ok(());
        }
        if inner.fail_writes > 0 {
            inner.fail_writes -= 1;
            return Err(StorageError::Io {
                path: PathBuf::from("<memory>"),
                source: std::io::Error::new(std::io::ErrorKind::Other, "injected write failure"),
            });
        }
        Ok(())
    }
}

impl RunStorage for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn load(&self) -> Result<StoredLedger, StorageError> {
        let inner = self.inner.lock();
        Ok(StoredLedger {
            runs: inner.runs.values().cloned().collect(),
            branches: inner.branches.clone(),
        })
    }

    fn put_run(&self, run: &Run) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        Self::check_fail(&mut inner)?;
        inner.runs.insert(run.id.clone(), run.clone());
        Ok(())
    }

    fn remove_run(&self, id: &RunId) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        Self::check_fail(&mut inner)?;
        inner.runs.remove(id);
        Ok(())
    }

    fn put_branches(&self, branches: &[Branch]) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        Self::check_fail(&mut inner)?;
        inner.branches = branches.to_vec();
        Ok(())
    }
}
