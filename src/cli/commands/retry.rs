//! retry command - Re-run a run on its own branch

use anyhow::{Context as _, Result};

use super::{block_on, open_engine, report_settled, verbosity};
use crate::engine::{Context, RunOverrides};
use crate::ui::output;

/// Retry a run, optionally with a different model or prompt.
pub fn retry(
    ctx: &Context,
    id: &str,
    model: Option<String>,
    same: bool,
    prompt: Option<String>,
) -> Result<()> {
    let verbosity = verbosity(ctx);
    let (engine, _config) = open_engine(ctx)?;
    let source = engine.resolve(id).context("Cannot retry")?;

    let overrides = RunOverrides {
        model,
        prompt,
        same_model: same,
    };

    let run = block_on(async {
        let pending = engine.retry_run(&source, &overrides).await?;
        output::print(
            format!("Retrying {} as {}", source.short(), pending.id().short()),
            verbosity,
        );
        pending.wait().await
    })??;

    report_settled(&run, verbosity)
}
