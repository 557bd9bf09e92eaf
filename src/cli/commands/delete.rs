//! delete command - Delete a run or a branch
//!
//! Deletion asks for confirmation unless `--force` is given. Without a
//! terminal to ask on, it refuses instead of guessing.

use anyhow::{bail, Context as _, Result};

use super::{open_engine, verbosity};
use crate::core::ledger::LedgerError;
use crate::core::types::BranchName;
use crate::engine::{Context, Engine};
use crate::ui::output::{self, Verbosity};
use crate::ui::prompts;

/// Delete a run (optionally with descendants) or a whole branch.
pub fn delete(
    ctx: &Context,
    target: &str,
    cascade: bool,
    branch: bool,
    force: bool,
) -> Result<()> {
    let verbosity = verbosity(ctx);
    let (engine, config) = open_engine(ctx)?;
    let interactive = ctx.interactive && config.interactive();

    if branch {
        let name = resolve_branch(&engine, target)?;
        if name == *engine.store().default_branch() {
            return Err(LedgerError::DefaultBranch(name).into());
        }
        let count = engine.store().branch(&name)?.run_count;
        let question = format!(
            "Delete branch '{}' and everything derived from its {} run(s)?",
            name, count
        );
        if !confirmed(&question, force, interactive)? {
            output::print("Cancelled.", verbosity);
            return Ok(());
        }

        let removed = engine.delete_branch(&name)?;
        if removed.len() > count {
            output::warn(
                format!(
                    "also removed {} run(s) on branches derived from '{}'",
                    removed.len() - count,
                    name
                ),
                verbosity,
            );
        }
        report(&format!("branch '{}'", name), removed.len(), verbosity);
        return Ok(());
    }

    let id = engine.resolve(target).context("Cannot delete run")?;
    let graph = engine.store().graph();
    let children = graph.child_count(&id);
    if children > 0 && !cascade {
        return Err(LedgerError::HasChildren { id, children }.into());
    }

    let question = if cascade && children > 0 {
        format!(
            "Delete {} and {} descendant run(s)?",
            id.short(),
            graph.subtree(&id).len() - 1
        )
    } else {
        format!("Delete {}?", id.short())
    };
    if !confirmed(&question, force, interactive)? {
        output::print("Cancelled.", verbosity);
        return Ok(());
    }

    let removed = engine.delete_run(&id, cascade)?;
    report(id.short(), removed.len(), verbosity);
    Ok(())
}

/// Interpret `target` as a branch name, falling back to the branch of the
/// run it identifies.
fn resolve_branch(engine: &Engine, target: &str) -> Result<BranchName, LedgerError> {
    if let Ok(name) = BranchName::new(target) {
        if engine.store().graph().has_branch(&name) {
            return Ok(name);
        }
    }

    match engine.resolve(target) {
        Ok(id) => engine
            .store()
            .graph()
            .resolved_branch(&id)
            .cloned()
            .ok_or(LedgerError::NotFound(id.to_string())),
        Err(e) if e.is_not_found() => Err(LedgerError::BranchNotFound(target.to_string())),
        Err(e) => Err(e),
    }
}

fn confirmed(question: &str, force: bool, interactive: bool) -> Result<bool> {
    if force {
        return Ok(true);
    }
    if !interactive {
        bail!("Refusing to delete without confirmation; pass --force");
    }
    Ok(prompts::confirm(question, false, interactive)?)
}

fn report(what: &str, removed: usize, verbosity: Verbosity) {
    output::print(format!("Deleted {} ({} run(s) removed)", what, removed), verbosity);
}
