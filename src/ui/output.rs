//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! User-facing output goes to stdout and respects the quiet flag; errors and
//! warnings go to stderr. Diagnostics for developers go through `tracing`
//! instead. When `--json` is requested, commands print JSON via
//! [`print_json`] regardless of verbosity.

use std::fmt::Display;

use serde::Serialize;

use crate::core::types::RunStatus;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print output that is the point of the command (always shown).
pub fn result(message: impl Display) {
    println!("{}", message);
}

/// Print a debug message (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Pretty-print a value as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format a duration in milliseconds the way the CLI shows it.
///
/// # Example
///
/// ```
/// use dusk::ui::output::format_duration;
///
/// assert_eq!(format_duration(Some(2300)), "2.3s");
/// assert_eq!(format_duration(Some(450)), "450ms");
/// assert_eq!(format_duration(None), "-");
/// ```
pub fn format_duration(duration_ms: Option<u64>) -> String {
    match duration_ms {
        None => "-".to_string(),
        Some(ms) if ms < 1000 => format!("{}ms", ms),
        Some(ms) => format!("{:.1}s", ms as f64 / 1000.0),
    }
}

/// Single-character marker for a status.
pub fn status_marker(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Pending => "…",
        RunStatus::Success => "✓",
        RunStatus::Failed => "✗",
    }
}

/// Cut `text` to `max` characters, appending a note with the full length.
pub fn truncate_output(text: &str, max: usize) -> String {
    let total = text.chars().count();
    if total <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}... ({} more characters, use --full)", cut, total - max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_flags() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(Some(0)), "0ms");
        assert_eq!(format_duration(Some(1000)), "1.0s");
        assert_eq!(format_duration(Some(61_260)), "61.3s");
    }

    #[test]
    fn truncation() {
        assert_eq!(truncate_output("short", 200), "short");
        let long = "é".repeat(205);
        let cut = truncate_output(&long, 200);
        assert!(cut.starts_with(&"é".repeat(200)));
        assert!(cut.ends_with("(5 more characters, use --full)"));
    }
}
