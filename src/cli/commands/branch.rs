//! branch command - Start a new branch from a run

use anyhow::{Context as _, Result};

use super::{block_on, open_engine, report_settled, verbosity};
use crate::core::types::{BranchName, UtcTimestamp};
use crate::engine::{Context, RunOverrides};
use crate::ui::output;

/// Branch from a run under `name`, or a generated `branch-<millis>` name.
pub fn branch(
    ctx: &Context,
    id: &str,
    name: Option<String>,
    model: Option<String>,
    prompt: Option<String>,
) -> Result<()> {
    let verbosity = verbosity(ctx);
    let (engine, _config) = open_engine(ctx)?;
    let source = engine.resolve(id).context("Cannot branch")?;

    let name = match name {
        Some(name) => name,
        None => generated_name(&UtcTimestamp::now()),
    };
    let name = BranchName::new(name).context("Invalid branch name")?;

    let overrides = RunOverrides {
        model,
        prompt,
        same_model: false,
    };

    let run = block_on(async {
        let pending = engine.branch_run(&source, name.clone(), &overrides).await?;
        output::print(
            format!(
                "Created branch '{}' from {} at {}",
                name,
                source.short(),
                pending.id().short()
            ),
            verbosity,
        );
        pending.wait().await
    })??;

    report_settled(&run, verbosity)
}

fn generated_name(now: &UtcTimestamp) -> String {
    format!("branch-{}", now.as_datetime().timestamp_millis())
}
