//! core::lock
//!
//! Exclusive lock over a ledger data directory.
//!
//! The lock ensures only one dusk process mutates a ledger at a time. It is
//! acquired when the file-backed store opens and released when the store is
//! dropped.
//!
//! # Invariants
//!
//! - Lock is held for the whole lifetime of the owning store
//! - Lock is automatically released on drop (RAII pattern)
//! - Lock acquisition is non-blocking (fails fast if locked)

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::DuskPaths;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("ledger at '{0}' is locked by another dusk process")]
    AlreadyLocked(PathBuf),

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),
}

/// An exclusive lock on a ledger data directory.
///
/// # Example
///
/// ```no_run
/// use dusk::core::lock::LedgerLock;
/// use dusk::core::paths::DuskPaths;
/// use std::path::PathBuf;
///
/// let paths = DuskPaths::new(PathBuf::from("/tmp/dusk-data"));
/// let lock = LedgerLock::acquire(&paths).unwrap();
/// assert!(lock.is_held());
/// // released when `lock` goes out of scope
/// ```
#[derive(Debug)]
pub struct LedgerLock {
    path: PathBuf,
    /// When this is Some, we hold the lock.
    file: Option<File>,
}

impl LedgerLock {
    /// Attempt to acquire the ledger lock.
    ///
    /// Uses OS-level file locking via `fs2`, which works across processes.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another process holds the lock
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be acquired
    pub fn acquire(paths: &DuskPaths) -> Result<Self, LockError> {
        fs::create_dir_all(&paths.data_dir).map_err(|e| {
            LockError::CreateFailed(format!(
                "cannot create {}: {}",
                paths.data_dir.display(),
                e
            ))
        })?;

        let path = paths.lock_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path,
                file: Some(file),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Err(LockError::AlreadyLocked(paths.data_dir.clone()))
            }
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Check if the lock is currently held.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock before the guard goes out of scope.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        // Best-effort release on drop
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}
