//! core::compare
//!
//! Line-oriented comparison of two run outputs.
//!
//! # Algorithm
//!
//! Outputs are split on `\n` only. A `\r` stays part of its line and a
//! trailing newline yields a final empty line, so two outputs produce the same
//! lines exactly when their bytes (and digests) are equal.
//!
//! Lines are aligned with a longest-common-subsequence table. The walk prefers
//! deleting a left line over inserting a right line when both keep the LCS
//! length, so the same inputs always yield the same script. Common leading and
//! trailing lines are matched before the table is built. When the remaining
//! middle would need more than [`LCS_CELL_LIMIT`] table cells, the middle is
//! reported as one deletion followed by one insertion instead.
//!
//! Adjacent lines of the same kind are coalesced into [`DiffOp`] runs with
//! 1-based line numbers on each side.
//!
//! # Example
//!
//! ```
//! use dusk::core::compare::{diff_lines, DiffOp};
//!
//! let ops = diff_lines("a\nb\nc", "a\nx\nc");
//! assert_eq!(ops.len(), 4);
//! assert!(matches!(&ops[1], DiffOp::Delete { left_start: 2, lines } if lines == &["b"]));
//! assert!(matches!(&ops[2], DiffOp::Insert { right_start: 2, lines } if lines == &["x"]));
//! ```

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::ledger::{LedgerError, Run, RunStore};
use super::types::{RunId, RunStatus};

/// How a comparison is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompareMode {
    #[default]
    SideBySide,
    Unified,
    Json,
}

impl CompareMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareMode::SideBySide => "side-by-side",
            CompareMode::Unified => "unified",
            CompareMode::Json => "json",
        }
    }
}

impl fmt::Display for CompareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompareMode {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "side-by-side" | "sbs" => Ok(CompareMode::SideBySide),
            "unified" | "diff" => Ok(CompareMode::Unified),
            "json" => Ok(CompareMode::Json),
            other => Err(LedgerError::InvalidInput(format!(
                "unknown compare format '{other}' (expected side-by-side, unified or json)"
            ))),
        }
    }
}

/// One coalesced run of diff lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DiffOp {
    Equal {
        left_start: usize,
        right_start: usize,
        lines: Vec<String>,
    },
    Delete {
        left_start: usize,
        lines: Vec<String>,
    },
    Insert {
        right_start: usize,
        lines: Vec<String>,
    },
}

impl DiffOp {
    /// Lines covered by this op.
    pub fn lines(&self) -> &[String] {
        match self {
            DiffOp::Equal { lines, .. }
            | DiffOp::Delete { lines, .. }
            | DiffOp::Insert { lines, .. } => lines,
        }
    }
}

/// Line counts and similarity for a comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffStats {
    pub inserted: usize,
    pub deleted: usize,
    pub unchanged: usize,
    /// `2 * unchanged / (left_lines + right_lines)`, 1.0 when both are empty.
    pub similarity: f64,
}

impl DiffStats {
    fn from_ops(ops: &[DiffOp]) -> Self {
        let mut stats = DiffStats {
            inserted: 0,
            deleted: 0,
            unchanged: 0,
            similarity: 1.0,
        };
        for op in ops {
            match op {
                DiffOp::Equal { lines, .. } => stats.unchanged += lines.len(),
                DiffOp::Delete { lines, .. } => stats.deleted += lines.len(),
                DiffOp::Insert { lines, .. } => stats.inserted += lines.len(),
            }
        }
        let total = 2 * stats.unchanged + stats.deleted + stats.inserted;
        if total > 0 {
            stats.similarity = (2 * stats.unchanged) as f64 / total as f64;
        }
        stats
    }
}

/// Result of comparing two successful runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub left: RunId,
    pub right: RunId,
    pub left_model: String,
    pub right_model: String,
    #[serde(skip)]
    pub mode: CompareMode,
    pub ops: Vec<DiffOp>,
    pub stats: DiffStats,
    pub left_digest: String,
    pub right_digest: String,
    pub identical: bool,
    /// Text rendering in `mode`.
    #[serde(skip)]
    pub rendered: String,
}

/// Compare two stored runs by id.
///
/// # Errors
///
/// - [`LedgerError::NotFound`] if either run is missing
/// - [`LedgerError::NotComparable`] if either run is not `Success`
pub fn compare(
    store: &RunStore,
    left: &RunId,
    right: &RunId,
    mode: CompareMode,
) -> Result<ComparisonResult, LedgerError> {
    let left = store.get(left)?;
    let right = store.get(right)?;
    compare_runs(&left, &right, mode)
}

/// Compare two runs already in hand.
pub fn compare_runs(
    left: &Run,
    right: &Run,
    mode: CompareMode,
) -> Result<ComparisonResult, LedgerError> {
    let left_output = comparable_output(left)?;
    let right_output = comparable_output(right)?;

    let ops = diff_lines(left_output, right_output);
    let stats = DiffStats::from_ops(&ops);
    let left_digest = digest(left_output);
    let right_digest = digest(right_output);

    let mut result = ComparisonResult {
        left: left.id.clone(),
        right: right.id.clone(),
        left_model: left.model.clone(),
        right_model: right.model.clone(),
        mode,
        ops,
        stats,
        identical: left_digest == right_digest,
        left_digest,
        right_digest,
        rendered: String::new(),
    };
    result.rendered = match mode {
        CompareMode::SideBySide => render_side_by_side(&result),
        CompareMode::Unified => render_unified(&result),
        CompareMode::Json => serde_json::to_string_pretty(&result).unwrap_or_default(),
    };
    Ok(result)
}

fn comparable_output(run: &Run) -> Result<&str, LedgerError> {
    match (&run.status, &run.output) {
        (RunStatus::Success, Some(output)) => Ok(output.as_str()),
        _ => Err(LedgerError::NotComparable {
            id: run.id.clone(),
            status: run.status,
        }),
    }
}

/// SHA-256 of an output, as `sha256:<hex>`.
pub fn digest(output: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(output.as_bytes());
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Edit {
    Equal,
    Delete,
    Insert,
}

/// Most LCS table cells built for one comparison.
pub const LCS_CELL_LIMIT: usize = 16 * 1024 * 1024;

/// Split an output into diff lines.
///
/// Joining the result with `\n` gives back `text`; the empty text has no
/// lines.
pub fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split('\n').collect()
    }
}

/// Diff two texts line by line.
pub fn diff_lines(left: &str, right: &str) -> Vec<DiffOp> {
    let a = split_lines(left);
    let b = split_lines(right);
    coalesce(&a, &b, &edit_script(&a, &b))
}

fn edit_script(a: &[&str], b: &[&str]) -> Vec<Edit> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let mid_a = &a[prefix..a.len() - suffix];
    let mid_b = &b[prefix..b.len() - suffix];

    let mut script = vec![Edit::Equal; prefix];
    if (mid_a.len() + 1).saturating_mul(mid_b.len() + 1) > LCS_CELL_LIMIT {
        tracing::debug!(
            left = mid_a.len(),
            right = mid_b.len(),
            "outputs too large for line alignment; using a coarse diff"
        );
        script.extend(std::iter::repeat(Edit::Delete).take(mid_a.len()));
        script.extend(std::iter::repeat(Edit::Insert).take(mid_b.len()));
    } else {
        script.extend(lcs_script(mid_a, mid_b));
    }
    script.extend(std::iter::repeat(Edit::Equal).take(suffix));
    script
}

fn lcs_script(a: &[&str], b: &[&str]) -> Vec<Edit> {
    let n = a.len();
    let m = b.len();

    // lcs[i * w + j] = LCS length of a[i..] and b[j..]
    let w = m + 1;
    let mut lcs = vec![0u32; (n + 1) * w];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * w + j] = if a[i] == b[j] {
                lcs[(i + 1) * w + j + 1] + 1
            } else {
                lcs[(i + 1) * w + j].max(lcs[i * w + j + 1])
            };
        }
    }

    let mut script = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            script.push(Edit::Equal);
            i += 1;
            j += 1;
        } else if lcs[(i + 1) * w + j] >= lcs[i * w + j + 1] {
            script.push(Edit::Delete);
            i += 1;
        } else {
            script.push(Edit::Insert);
            j += 1;
        }
    }
    script.extend(std::iter::repeat(Edit::Delete).take(n - i));
    script.extend(std::iter::repeat(Edit::Insert).take(m - j));
    script
}

fn coalesce(a: &[&str], b: &[&str], script: &[Edit]) -> Vec<DiffOp> {
    let mut ops: Vec<DiffOp> = Vec::new();
    let (mut i, mut j) = (0, 0);

    for &edit in script {
        match (edit, ops.last_mut()) {
            (Edit::Equal, Some(DiffOp::Equal { lines, .. })) => lines.push(a[i].to_string()),
            (Edit::Delete, Some(DiffOp::Delete { lines, .. })) => lines.push(a[i].to_string()),
            (Edit::Insert, Some(DiffOp::Insert { lines, .. })) => lines.push(b[j].to_string()),
            (Edit::Equal, _) => ops.push(DiffOp::Equal {
                left_start: i + 1,
                right_start: j + 1,
                lines: vec![a[i].to_string()],
            }),
            (Edit::Delete, _) => ops.push(DiffOp::Delete {
                left_start: i + 1,
                lines: vec![a[i].to_string()],
            }),
            (Edit::Insert, _) => ops.push(DiffOp::Insert {
                right_start: j + 1,
                lines: vec![b[j].to_string()],
            }),
        }
        match edit {
            Edit::Equal => {
                i += 1;
                j += 1;
            }
            Edit::Delete => i += 1,
            Edit::Insert => j += 1,
        }
    }
    ops
}

fn render_unified(result: &ComparisonResult) -> String {
    let mut out = format!("--- {}\n+++ {}\n", result.left, result.right);
    for op in &result.ops {
        let marker = match op {
            DiffOp::Equal { .. } => ' ',
            DiffOp::Delete { .. } => '-',
            DiffOp::Insert { .. } => '+',
        };
        for line in op.lines() {
            out.push(marker);
            out.push_str(&visible(line));
            out.push('\n');
        }
    }
    out
}

/// Widest left cell before lines are cut.
const SIDE_BY_SIDE_MAX_WIDTH: usize = 60;

fn render_side_by_side(result: &ComparisonResult) -> String {
    let width = result
        .ops
        .iter()
        .filter(|op| !matches!(op, DiffOp::Insert { .. }))
        .flat_map(|op| op.lines())
        .map(|l| visible(l).chars().count())
        .chain(std::iter::once(result.left.short().len()))
        .max()
        .unwrap_or(0)
        .min(SIDE_BY_SIDE_MAX_WIDTH);

    let mut out = String::new();
    push_row(&mut out, width, result.left.short(), '|', result.right.short());
    for op in &result.ops {
        for line in op.lines() {
            let shown = visible(line);
            match op {
                DiffOp::Equal { .. } => push_row(&mut out, width, &shown, '|', &shown),
                DiffOp::Delete { .. } => push_row(&mut out, width, &shown, '<', ""),
                DiffOp::Insert { .. } => push_row(&mut out, width, "", '>', &shown),
            }
        }
    }
    out
}

/// Show carriage returns so line-ending differences are readable.
fn visible(line: &str) -> Cow<'_, str> {
    if line.contains('\r') {
        Cow::Owned(line.replace('\r', "\\r"))
    } else {
        Cow::Borrowed(line)
    }
}

fn push_row(out: &mut String, width: usize, left: &str, marker: char, right: &str) {
    let left = fit(left, width);
    let pad = width - left.chars().count();
    let row = format!("{left}{} {marker} {right}", " ".repeat(pad));
    out.push_str(row.trim_end());
    out.push('\n');
}

fn fit(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let keep = width.saturating_sub(1);
    let mut cut: String = text.chars().take(keep).collect();
    cut.push('~');
    cut
}
