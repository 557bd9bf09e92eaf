//! explain command - Explain how a run came to be
//!
//! Shows the run's model, status and timing alongside where it sits in the
//! lineage: which branch it resolves to, the branches along its ancestor
//! chain, and what was derived from it. `--trace` prints every ancestor.

use anyhow::{Context as _, Result};

use super::open_engine;
use crate::core::graph::snippet;
use crate::core::ledger::Run;
use crate::engine::{Context, Explanation};
use crate::ui::output;

/// Describe a run and its lineage.
pub fn explain(ctx: &Context, id: &str, trace: bool) -> Result<()> {
    let (engine, _config) = open_engine(ctx)?;
    let id = engine.resolve(id).context("Cannot explain run")?;
    let explained = engine.explain_run(&id)?;

    output::result(describe(&explained, trace));
    Ok(())
}

fn describe(explained: &Explanation, trace: bool) -> String {
    let run = &explained.run;
    let mut lines = vec![
        format!("Run {}", run.id),
        format!("  Model:     {}", run.model),
        format!("  Status:    {}", run.status),
        format!("  Duration:  {}", output::format_duration(run.duration_ms)),
    ];

    let started = if explained.starts_branch() {
        " (started here)"
    } else {
        ""
    };
    lines.push(format!("  Branch:    {}{}", explained.branch, started));
    let names: Vec<&str> = explained.branches.iter().map(|b| b.as_str()).collect();
    lines.push(format!("  Branches:  {}", names.join(", ")));
    lines.push(format!("  Depth:     {}", explained.depth));

    match explained.ancestors.first() {
        Some(parent) => lines.push(format!(
            "  Derived from {} ({})",
            parent.id.short(),
            derivation(run, parent)
        )),
        None => lines.push("  Root run".to_string()),
    }

    if !explained.children.is_empty() {
        let kids: Vec<&str> = explained.children.iter().map(|c| c.id.short()).collect();
        lines.push(format!("  Children:  {}", kids.join(", ")));
    }

    if trace {
        lines.push(String::new());
        lines.push("Trace (root first):".to_string());
        for ancestor in explained.ancestors.iter().rev().chain(std::iter::once(run)) {
            lines.push(format!(
                "  {} {} ({}) \"{}\"",
                output::status_marker(ancestor.status),
                ancestor.id.short(),
                ancestor.model,
                snippet(&ancestor.prompt, 60)
            ));
        }
    }

    lines.join("\n")
}

/// What changed between a parent and its child.
fn derivation(run: &Run, parent: &Run) -> String {
    let mut changes = Vec::new();
    if run.model != parent.model {
        changes.push(format!("model {} -> {}", parent.model, run.model));
    }
    if run.prompt != parent.prompt {
        changes.push("new prompt".to_string());
    }
    if let Some(name) = &run.branch_name {
        changes.push(format!("branched as {}", name));
    }
    if changes.is_empty() {
        "retry".to_string()
    } else {
        changes.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::{RunDraft, RunStore};
    use crate::core::types::BranchName;

    #[test]
    fn describes_branched_run_with_trace() {
        let store = RunStore::in_memory(BranchName::new("main").unwrap());
        let root = store.create(RunDraft::root("explain X", "gpt-4")).unwrap();
        let child = store
            .create(
                RunDraft::child(root.id.clone(), "explain X", "claude-3")
                    .on_branch(BranchName::new("exp").unwrap()),
            )
            .unwrap();

        let explained = Explanation::build(&store.graph(), &child.id).unwrap();
        let text = describe(&explained, true);
        assert!(text.contains("Branch:    exp (started here)"));
        assert!(text.contains("Branches:  exp, main"));
        assert!(text.contains("model gpt-4 -> claude-3, branched as exp"));

        let trace = text.split("Trace (root first):").nth(1).unwrap();
        let root_at = trace.find(root.id.short()).unwrap();
        let child_at = trace.find(child.id.short()).unwrap();
        assert!(root_at < child_at);
    }

    #[test]
    fn plain_retry() {
        let store = RunStore::in_memory(BranchName::new("main").unwrap());
        let root = store.create(RunDraft::root("p", "gpt-4")).unwrap();
        let retry = store.create(RunDraft::child(root.id.clone(), "p", "gpt-4")).unwrap();
        let explained = Explanation::build(&store.graph(), &retry.id).unwrap();
        assert!(describe(&explained, false).contains("(retry)"));
        assert!(describe(&Explanation::build(&store.graph(), &root.id).unwrap(), false)
            .contains("Root run"));
    }
}
