//! run command - Run a prompt against a model

use anyhow::Result;

use super::{block_on, open_engine, report_settled, verbosity};
use crate::engine::Context;
use crate::ui::output;

/// Submit a prompt and wait for the provider to answer.
pub fn run(ctx: &Context, prompt: &str, model: Option<&str>) -> Result<()> {
    let verbosity = verbosity(ctx);
    let (engine, _config) = open_engine(ctx)?;

    let run = block_on(async {
        let pending = engine.submit_run(prompt, model).await?;
        output::debug(
            format!("submitted {} to {}", pending.id(), pending.pending().model),
            verbosity,
        );
        pending.wait().await
    })??;

    report_settled(&run, verbosity)
}
