//! history command - List recent runs

use anyhow::{Context as _, Result};

use super::{open_engine, verbosity};
use crate::core::graph::snippet;
use crate::core::ledger::{Run, RunFilter};
use crate::core::types::{BranchName, RunStatus};
use crate::engine::Context;
use crate::ui::output;

/// List up to `limit` runs, newest first.
pub fn history(
    ctx: &Context,
    limit: usize,
    filter: Option<&str>,
    branch: Option<&str>,
) -> Result<()> {
    let verbosity = verbosity(ctx);
    let (engine, _config) = open_engine(ctx)?;

    let status = filter
        .map(str::parse::<RunStatus>)
        .transpose()
        .context("Invalid --filter")?;
    let branch = branch
        .map(BranchName::new)
        .transpose()
        .context("Invalid --branch")?;

    // An unknown branch is an error; the default branch may simply be empty.
    if let Some(name) = &branch {
        if name != engine.store().default_branch() {
            engine.store().branch(name)?;
        }
    }

    let graph = engine.store().graph();
    let runs = engine.list_runs(&RunFilter { status, branch }, Some(limit));
    if runs.is_empty() {
        output::print("No runs yet.", verbosity);
        return Ok(());
    }

    for run in &runs {
        let branch = graph
            .resolved_branch(&run.id)
            .map(|b| b.as_str())
            .unwrap_or_default();
        output::result(history_line(run, branch));
    }
    Ok(())
}

fn history_line(run: &Run, branch: &str) -> String {
    format!(
        "{} {}  {}  {:<8} {:<14} {:<12} \"{}\"",
        output::status_marker(run.status),
        run.id.short(),
        run.created_at.display_short(),
        run.status,
        run.model,
        branch,
        snippet(&run.prompt, 50)
    )
}
