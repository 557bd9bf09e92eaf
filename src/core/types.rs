//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`RunId`] - Opaque run identifier
//! - [`BranchName`] - Validated branch label
//! - [`RunStatus`] - Run lifecycle state
//! - [`UtcTimestamp`] - RFC3339 timestamp
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use dusk::core::types::{BranchName, RunId};
//!
//! let branch = BranchName::new("experiment-1").unwrap();
//! assert_eq!(branch.as_str(), "experiment-1");
//!
//! let id = RunId::generate();
//! assert!(id.as_str().starts_with("run-"));
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(RunId::parse("not-a-run").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid run id: {0}")]
    InvalidRunId(String),

    #[error("invalid run status: {0}")]
    InvalidStatus(String),
}

/// An opaque run identifier.
///
/// Identifiers have the form `run-<32 lowercase hex digits>`, derived from a
/// random v4 UUID. They are assigned once by the store and never change.
///
/// # Example
///
/// ```
/// use dusk::core::types::RunId;
///
/// let id = RunId::parse("run-0123456789abcdef0123456789abcdef").unwrap();
/// assert_eq!(id.short(), "run-01234567");
///
/// // Parsing normalizes case
/// let upper = RunId::parse("RUN-0123456789ABCDEF0123456789ABCDEF").unwrap();
/// assert_eq!(upper, id);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunId(String);

impl RunId {
    /// Prefix shared by every run id.
    pub const PREFIX: &'static str = "run-";

    /// Number of hex digits after the prefix.
    const HEX_LEN: usize = 32;

    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        Self(format!(
            "{}{}",
            Self::PREFIX,
            uuid::Uuid::new_v4().simple()
        ))
    }

    /// Parse a full run id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRunId` if the string is not a complete id.
    pub fn parse(s: impl Into<String>) -> Result<Self, TypeError> {
        let s = s.into().to_ascii_lowercase();
        let Some(hex) = s.strip_prefix(Self::PREFIX) else {
            return Err(TypeError::InvalidRunId(format!(
                "'{s}' must start with '{}'",
                Self::PREFIX
            )));
        };
        if hex.len() != Self::HEX_LEN || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidRunId(format!(
                "'{s}' must be '{}' followed by {} hex digits",
                Self::PREFIX,
                Self::HEX_LEN
            )));
        }
        Ok(Self(s))
    }

    /// Abbreviated form used in listings (`run-` plus 8 hex digits).
    pub fn short(&self) -> &str {
        let end = (Self::PREFIX.len() + 8).min(self.0.len());
        &self.0[..end]
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RunId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<RunId> for String {
    fn from(id: RunId) -> Self {
        id.0
    }
}

impl AsRef<str> for RunId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated branch label.
///
/// Branch names:
/// - Cannot be empty or longer than 64 characters
/// - Use only ASCII alphanumerics and `-`, `_`, `.`, `/`
/// - Cannot start with `.`, `-` or `/`, or end with `/`
/// - Cannot contain `..` or `//`
///
/// # Example
///
/// ```
/// use dusk::core::types::BranchName;
///
/// let name = BranchName::new("experiments/tone").unwrap();
/// assert_eq!(name.as_str(), "experiments/tone");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new(".hidden").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Longest accepted branch name.
    pub const MAX_LEN: usize = 64;

    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates the naming rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot be empty".into(),
            ));
        }
        if name.len() > Self::MAX_LEN {
            return Err(TypeError::InvalidBranchName(format!(
                "branch name cannot exceed {} characters",
                Self::MAX_LEN
            )));
        }

        for leading in ['.', '-', '/'] {
            if name.starts_with(leading) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot start with '{leading}'"
                )));
            }
        }
        if name.ends_with('/') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot end with '/'".into(),
            ));
        }
        for seq in ["..", "//"] {
            if name.contains(seq) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{seq}'"
                )));
            }
        }

        if let Some(c) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/')))
        {
            return Err(TypeError::InvalidBranchName(format!(
                "branch name cannot contain {c:?}"
            )));
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a run.
///
/// `Pending` is the only non-terminal state. A run moves to `Success` or
/// `Failed` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Success,
    Failed,
}

impl RunStatus {
    /// Whether the status is final.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Pending)
    }

    /// Whether `self -> next` is an allowed transition.
    ///
    /// # Example
    ///
    /// ```
    /// use dusk::core::types::RunStatus;
    ///
    /// assert!(RunStatus::Pending.can_transition_to(RunStatus::Success));
    /// assert!(!RunStatus::Success.can_transition_to(RunStatus::Failed));
    /// assert!(!RunStatus::Pending.can_transition_to(RunStatus::Pending));
    /// ```
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        matches!(self, RunStatus::Pending) && next.is_terminal()
    }

    /// Lowercase name used in output and filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for RunStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(RunStatus::Pending),
            "success" => Ok(RunStatus::Success),
            "failed" => Ok(RunStatus::Failed),
            other => Err(TypeError::InvalidStatus(format!(
                "'{other}' (expected success, failed or pending)"
            ))),
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A UTC timestamp that serializes as RFC3339.
///
/// # Example
///
/// ```
/// use dusk::core::types::UtcTimestamp;
///
/// let now = UtcTimestamp::now();
/// println!("Current time: {}", now);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Create a timestamp for the current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    /// Create a timestamp from a chrono DateTime.
    pub fn from_datetime(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Self(dt)
    }

    /// Get the underlying datetime.
    pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }

    /// Compact human form (`2024-01-15 10:30:45`).
    pub fn display_short(&self) -> String {
        self.0.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod run_id {
        use super::*;

        #[test]
        fn generated_ids_parse_back() {
            let id = RunId::generate();
            assert_eq!(RunId::parse(id.as_str()).unwrap(), id);
        }

        #[test]
        fn generated_ids_are_unique() {
            let a = RunId::generate();
            let b = RunId::generate();
            assert_ne!(a, b);
        }

        #[test]
        fn rejects_missing_prefix() {
            assert!(RunId::parse("0123456789abcdef0123456789abcdef").is_err());
        }

        #[test]
        fn rejects_wrong_length() {
            assert!(RunId::parse("run-0123").is_err());
        }

        #[test]
        fn rejects_non_hex() {
            assert!(RunId::parse("run-zz23456789abcdef0123456789abcdef").is_err());
        }

        #[test]
        fn serde_roundtrip() {
            let id = RunId::generate();
            let json = serde_json::to_string(&id).unwrap();
            let parsed: RunId = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, id);
        }

        #[test]
        fn deserialize_rejects_garbage() {
            let result: Result<RunId, _> = serde_json::from_str("\"bogus\"");
            assert!(result.is_err());
        }
    }

    mod branch_name {
        use super::*;

        #[test]
        fn accepts_common_names() {
            for name in ["main", "experiment-1", "feat/tone_v2", "v1.2"] {
                assert!(BranchName::new(name).is_ok(), "{name} should be valid");
            }
        }

        #[test]
        fn rejects_bad_names() {
            for name in [
                "", ".x", "-x", "/x", "x/", "a..b", "a//b", "has space", "tab\t", "ünï",
            ] {
                assert!(BranchName::new(name).is_err(), "{name:?} should be invalid");
            }
        }

        #[test]
        fn rejects_overlong() {
            let name = "a".repeat(BranchName::MAX_LEN + 1);
            assert!(BranchName::new(name).is_err());
            assert!(BranchName::new("a".repeat(BranchName::MAX_LEN)).is_ok());
        }
    }

    mod run_status {
        use super::*;

        #[test]
        fn only_pending_transitions() {
            use RunStatus::*;
            assert!(Pending.can_transition_to(Success));
            assert!(Pending.can_transition_to(Failed));
            for from in [Success, Failed] {
                for to in [Pending, Success, Failed] {
                    assert!(!from.can_transition_to(to));
                }
            }
        }

        #[test]
        fn parses_case_insensitively() {
            assert_eq!("SUCCESS".parse::<RunStatus>().unwrap(), RunStatus::Success);
            assert!("done".parse::<RunStatus>().is_err());
        }

        #[test]
        fn serializes_snake_case() {
            let json = serde_json::to_string(&RunStatus::Failed).unwrap();
            assert_eq!(json, "\"failed\"");
        }
    }
}
