//! compare command - Compare the outputs of two runs

use anyhow::{Context as _, Result};

use super::{open_engine, verbosity};
use crate::cli::args::CompareFormat;
use crate::core::compare::CompareMode;
use crate::engine::Context;
use crate::ui::output;

/// Diff two runs' outputs in the requested format.
pub fn compare(
    ctx: &Context,
    left: &str,
    right: &str,
    format: Option<CompareFormat>,
    diff: bool,
) -> Result<()> {
    let verbosity = verbosity(ctx);
    let (engine, _config) = open_engine(ctx)?;
    let left = engine.resolve(left).context("Cannot compare")?;
    let right = engine.resolve(right).context("Cannot compare")?;

    let mode = if diff {
        CompareMode::Unified
    } else {
        format.map(CompareMode::from).unwrap_or_default()
    };

    let result = engine.compare_runs(&left, &right, mode)?;
    output::result(result.rendered.trim_end());

    if mode != CompareMode::Json {
        let summary = if result.identical {
            "Outputs are identical.".to_string()
        } else {
            format!(
                "{} added, {} removed, {} unchanged ({:.0}% similar)",
                result.stats.inserted,
                result.stats.deleted,
                result.stats.unchanged,
                result.stats.similarity * 100.0
            )
        };
        output::print(format!("\n{}", summary), verbosity);
    }
    Ok(())
}
