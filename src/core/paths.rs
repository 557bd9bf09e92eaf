//! core::paths
//!
//! Centralized path routing for dusk storage locations.
//!
//! **Hard rule:** no code outside this module computes paths inside the
//! data directory. Everything goes through [`DuskPaths`].
//!
//! # Storage Layout
//!
//! All ledger data lives under the data directory:
//! - `runs/<run-id>.json` - One record per run
//! - `branches.json` - Branch index (name -> head run)
//! - `lock` - Exclusive lock file
//!
//! # Data Directory Resolution
//!
//! Resolved in this order (first match wins):
//! 1. `--data-dir` flag
//! 2. `$DUSK_DATA_DIR`
//! 3. `data_dir` in the global config
//! 4. `~/.dusk/data`
//!
//! # Example
//!
//! ```
//! use dusk::core::paths::DuskPaths;
//! use std::path::PathBuf;
//!
//! let paths = DuskPaths::new(PathBuf::from("/home/me/.dusk/data"));
//!
//! assert_eq!(
//!     paths.branches_path(),
//!     PathBuf::from("/home/me/.dusk/data/branches.json")
//! );
//! ```

use std::path::{Path, PathBuf};

use crate::core::types::RunId;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "DUSK_DATA_DIR";

/// Path routing for one ledger data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuskPaths {
    /// Root of the ledger data.
    pub data_dir: PathBuf,
}

impl DuskPaths {
    /// Create paths rooted at `data_dir`.
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Resolve the data directory from flag, environment and config.
    ///
    /// Returns `None` only when nothing is configured and no home directory
    /// can be found.
    pub fn resolve(flag: Option<&Path>, configured: Option<&Path>) -> Option<Self> {
        if let Some(dir) = flag {
            return Some(Self::new(dir.to_path_buf()));
        }
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.is_empty() {
                return Some(Self::new(PathBuf::from(dir)));
            }
        }
        if let Some(dir) = configured {
            return Some(Self::new(dir.to_path_buf()));
        }
        dirs::home_dir().map(|home| Self::new(home.join(".dusk").join("data")))
    }

    /// Directory holding one JSON file per run.
    ///
    /// # Example
    ///
    /// ```
    /// use dusk::core::paths::DuskPaths;
    /// use std::path::PathBuf;
    ///
    /// let paths = DuskPaths::new(PathBuf::from("/data"));
    /// assert_eq!(paths.runs_dir(), PathBuf::from("/data/runs"));
    /// ```
    pub fn runs_dir(&self) -> PathBuf {
        self.data_dir.join("runs")
    }

    /// Record file for a single run.
    pub fn run_path(&self, id: &RunId) -> PathBuf {
        self.runs_dir().join(format!("{}.json", id.as_str()))
    }

    /// Branch index file.
    pub fn branches_path(&self) -> PathBuf {
        self.data_dir.join("branches.json")
    }

    /// Exclusive lock file.
    pub fn lock_path(&self) -> PathBuf {
        self.data_dir.join("lock")
    }
}
