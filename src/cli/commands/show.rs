//! show command - Show a run's details

use anyhow::{Context as _, Result};

use super::open_engine;
use crate::core::compare::digest;
use crate::engine::Context;
use crate::ui::output;

/// Characters of output shown without `--full`.
const PREVIEW_CHARS: usize = 200;

/// Print metadata, prompt and output of one run.
pub fn show(ctx: &Context, id: &str, full: bool) -> Result<()> {
    let (engine, _config) = open_engine(ctx)?;
    let id = engine.resolve(id).context("Cannot show run")?;
    let explained = engine.explain_run(&id)?;
    let run = &explained.run;

    println!("Run {}", run.id);
    println!();
    println!("Metadata:");
    println!("  Model:     {}", run.model);
    println!("  Status:    {}", run.status);
    println!("  Branch:    {}", explained.branch);
    match &run.parent_id {
        Some(parent) => println!("  Parent:    {}", parent),
        None => println!("  Parent:    (root)"),
    }
    println!("  Created:   {}", run.created_at.display_short());
    if let Some(settled) = &run.settled_at {
        println!("  Settled:   {}", settled.display_short());
    }
    println!("  Duration:  {}", output::format_duration(run.duration_ms));

    println!();
    println!("Prompt:");
    println!("{}", run.prompt);

    println!();
    match &run.output {
        None => println!("Output: (none yet)"),
        Some(text) if full => {
            println!("Output ({}):", digest(text));
            println!("{}", text);
        }
        Some(text) => {
            println!("Output:");
            println!("{}", output::truncate_output(text, PREVIEW_CHARS));
        }
    }
    Ok(())
}
