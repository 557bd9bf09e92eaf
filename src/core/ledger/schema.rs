//! core::ledger::schema
//!
//! Run and branch records, and the on-disk record format (v1).
//!
//! # Schema Design
//!
//! Persisted records are:
//! - Self-describing with `kind` and `schema_version`
//! - Strictly parsed (unknown fields rejected)
//!
//! # Example
//!
//! ```
//! use dusk::core::ledger::schema::{parse_run_record, RunRecordV1, RUN_RECORD_KIND};
//! use dusk::core::ledger::Run;
//! use dusk::core::types::{RunId, RunStatus, UtcTimestamp};
//!
//! let run = Run {
//!     id: RunId::generate(),
//!     parent_id: None,
//!     branch_name: None,
//!     prompt: "Explain React hooks".into(),
//!     model: "gpt-4".into(),
//!     status: RunStatus::Pending,
//!     output: None,
//!     created_at: UtcTimestamp::now(),
//!     settled_at: None,
//!     duration_ms: None,
//!     seq: 1,
//! };
//!
//! let record = RunRecordV1::new(run.clone());
//! assert_eq!(record.kind, RUN_RECORD_KIND);
//!
//! let json = serde_json::to_string(&record).unwrap();
//! assert_eq!(parse_run_record(&json).unwrap(), run);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{BranchName, RunId, RunStatus, UtcTimestamp};

/// The kind identifier for run records.
pub const RUN_RECORD_KIND: &str = "dusk.run";

/// The kind identifier for the branch index.
pub const BRANCH_INDEX_KIND: &str = "dusk.branch-index";

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from record parsing.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to parse record: {0}")]
    ParseError(String),

    #[error("invalid kind '{found}', expected '{expected}'")]
    InvalidKind { found: String, expected: &'static str },

    #[error("unsupported schema version {0}, supported: {SCHEMA_VERSION}")]
    UnsupportedVersion(u32),

    #[error("invalid record: {0}")]
    InvalidValue(String),
}

/// One executed or pending prompt invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Run {
    pub id: RunId,
    /// Run this one was retried or branched from; `None` for roots.
    pub parent_id: Option<RunId>,
    /// Set when this run starts a new named branch.
    pub branch_name: Option<BranchName>,
    pub prompt: String,
    pub model: String,
    pub status: RunStatus,
    /// Model output on success, provider error message on failure.
    pub output: Option<String>,
    pub created_at: UtcTimestamp,
    pub settled_at: Option<UtcTimestamp>,
    pub duration_ms: Option<u64>,
    /// Store-assigned sequence; breaks `created_at` ties.
    pub seq: u64,
}

impl Run {
    /// Chronological order: `created_at`, then `seq`, then id.
    pub fn chrono_cmp(&self, other: &Run) -> std::cmp::Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then(self.seq.cmp(&other.seq))
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Whether this run is a root (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Check the status/output invariant.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::InvalidValue` if a successful run has no output
    /// or a pending run carries output or a duration.
    pub fn validate(&self) -> Result<(), SchemaError> {
        match self.status {
            RunStatus::Success if self.output.is_none() => Err(SchemaError::InvalidValue(
                format!("run {} is successful but has no output", self.id),
            )),
            RunStatus::Pending if self.output.is_some() || self.duration_ms.is_some() => {
                Err(SchemaError::InvalidValue(format!(
                    "run {} is pending but carries a result",
                    self.id
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Input to [`RunStore::create`](super::RunStore::create).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunDraft {
    pub parent_id: Option<RunId>,
    pub branch_name: Option<BranchName>,
    pub prompt: String,
    pub model: String,
}

impl RunDraft {
    /// Draft for a root run.
    pub fn root(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            parent_id: None,
            branch_name: None,
            prompt: prompt.into(),
            model: model.into(),
        }
    }

    /// Draft for a same-branch child of `parent`.
    pub fn child(parent: RunId, prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            parent_id: Some(parent),
            branch_name: None,
            prompt: prompt.into(),
            model: model.into(),
        }
    }

    /// Start a new named branch with this draft.
    pub fn on_branch(mut self, name: BranchName) -> Self {
        self.branch_name = Some(name);
        self
    }
}

/// Settlement applied by [`RunStore::update`](super::RunStore::update).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPatch {
    pub status: RunStatus,
    pub output: Option<String>,
    pub duration_ms: Option<u64>,
}

impl RunPatch {
    /// Successful settlement.
    pub fn success(output: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            status: RunStatus::Success,
            output: Some(output.into()),
            duration_ms: Some(duration_ms),
        }
    }

    /// Failed settlement retaining the error message as output.
    pub fn failed(message: impl Into<String>, duration_ms: Option<u64>) -> Self {
        Self {
            status: RunStatus::Failed,
            output: Some(message.into()),
            duration_ms,
        }
    }
}

/// Filter for [`RunStore::list`](super::RunStore::list).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFilter {
    pub status: Option<RunStatus>,
    pub branch: Option<BranchName>,
}

/// A named pointer to the most recent run on a lineage path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Branch {
    pub name: BranchName,
    pub head_run_id: RunId,
    /// Run that started the branch; `None` for the default branch.
    pub start_run_id: Option<RunId>,
    pub run_count: usize,
}

/// On-disk form of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunRecordV1 {
    pub kind: String,
    pub schema_version: u32,
    pub run: Run,
}

impl RunRecordV1 {
    /// Wrap a run for persistence.
    pub fn new(run: Run) -> Self {
        Self {
            kind: RUN_RECORD_KIND.to_string(),
            schema_version: SCHEMA_VERSION,
            run,
        }
    }
}

/// On-disk form of the branch index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BranchIndexV1 {
    pub kind: String,
    pub schema_version: u32,
    pub branches: Vec<Branch>,
}

impl BranchIndexV1 {
    pub fn new(branches: Vec<Branch>) -> Self {
        Self {
            kind: BRANCH_INDEX_KIND.to_string(),
            schema_version: SCHEMA_VERSION,
            branches,
        }
    }
}

/// Envelope for version dispatch before full parsing.
#[derive(Debug, Deserialize)]
struct Envelope {
    kind: String,
    schema_version: u32,
}

fn check_envelope(json: &str, expected: &'static str) -> Result<(), SchemaError> {
    let envelope: Envelope =
        serde_json::from_str(json).map_err(|e| SchemaError::ParseError(e.to_string()))?;

    if envelope.kind != expected {
        return Err(SchemaError::InvalidKind {
            found: envelope.kind,
            expected,
        });
    }
    if envelope.schema_version != SCHEMA_VERSION {
        return Err(SchemaError::UnsupportedVersion(envelope.schema_version));
    }
    Ok(())
}

/// Parse a run record with version dispatch.
///
/// # Errors
///
/// Returns an error if the JSON is malformed, the kind or version is wrong,
/// or the run violates the status/output invariant.
pub fn parse_run_record(json: &str) -> Result<Run, SchemaError> {
    check_envelope(json, RUN_RECORD_KIND)?;
    let record: RunRecordV1 =
        serde_json::from_str(json).map_err(|e| SchemaError::ParseError(e.to_string()))?;
    record.run.validate()?;
    Ok(record.run)
}

/// Parse the branch index with version dispatch.
pub fn parse_branch_index(json: &str) -> Result<Vec<Branch>, SchemaError> {
    check_envelope(json, BRANCH_INDEX_KIND)?;
    let index: BranchIndexV1 =
        serde_json::from_str(json).map_err(|e| SchemaError::ParseError(e.to_string()))?;
    Ok(index.branches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_run() -> Run {
        Run {
            id: RunId::generate(),
            parent_id: None,
            branch_name: None,
            prompt: "Write a CLI tool".into(),
            model: "gpt-3.5-turbo".into(),
            status: RunStatus::Success,
            output: Some("fn main() {}".into()),
            created_at: UtcTimestamp::now(),
            settled_at: Some(UtcTimestamp::now()),
            duration_ms: Some(1200),
            seq: 7,
        }
    }

    #[test]
    fn record_roundtrip() {
        let run = sample_run();
        let json = serde_json::to_string_pretty(&RunRecordV1::new(run.clone())).unwrap();
        assert_eq!(parse_run_record(&json).unwrap(), run);
    }

    #[test]
    fn rejects_wrong_kind() {
        let mut record = RunRecordV1::new(sample_run());
        record.kind = "something.else".into();
        let json = serde_json::to_string(&record).unwrap();
        assert!(matches!(
            parse_run_record(&json),
            Err(SchemaError::InvalidKind { .. })
        ));
    }

    #[test]
    fn rejects_future_version() {
        let mut record = RunRecordV1::new(sample_run());
        record.schema_version = 2;
        let json = serde_json::to_string(&record).unwrap();
        assert!(matches!(
            parse_run_record(&json),
            Err(SchemaError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn rejects_success_without_output() {
        let mut run = sample_run();
        run.output = None;
        let json = serde_json::to_string(&RunRecordV1::new(run)).unwrap();
        assert!(matches!(
            parse_run_record(&json),
            Err(SchemaError::InvalidValue(_))
        ));
    }

    #[test]
    fn rejects_unknown_fields() {
        let run = sample_run();
        let mut value = serde_json::to_value(RunRecordV1::new(run)).unwrap();
        value["run"]["extra"] = serde_json::json!(true);
        let json = serde_json::to_string(&value).unwrap();
        assert!(parse_run_record(&json).is_err());
    }

    #[test]
    fn branch_index_roundtrip() {
        let branch = Branch {
            name: BranchName::new("experiment-1").unwrap(),
            head_run_id: RunId::generate(),
            start_run_id: Some(RunId::generate()),
            run_count: 2,
        };
        let json = serde_json::to_string(&BranchIndexV1::new(vec![branch.clone()])).unwrap();
        assert_eq!(parse_branch_index(&json).unwrap(), vec![branch]);
    }

    #[test]
    fn failed_patch_keeps_message() {
        let patch = RunPatch::failed("timed out after 30s", None);
        assert_eq!(patch.status, RunStatus::Failed);
        assert_eq!(patch.output.as_deref(), Some("timed out after 30s"));
    }
}
