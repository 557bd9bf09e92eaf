//! models command - List configured models

use anyhow::Result;

use super::{load_config, verbosity};
use crate::core::config::schema::ModelEntry;
use crate::engine::Context;
use crate::ui::output;

/// Print remote and local models from the config catalog.
pub fn models(ctx: &Context, local: bool, remote: bool) -> Result<()> {
    let verbosity = verbosity(ctx);
    let config = load_config()?;
    let (locals, remotes): (Vec<ModelEntry>, Vec<ModelEntry>) =
        config.models().into_iter().partition(|m| m.local);
    let default = config.default_model();

    let mut sections = Vec::new();
    if !local {
        sections.push(("Remote models:", remotes));
    }
    if !remote {
        sections.push(("Local models:", locals));
    }

    for (i, (title, entries)) in sections.into_iter().enumerate() {
        if i > 0 {
            output::print("", verbosity);
        }
        output::print(title, verbosity);
        if entries.is_empty() {
            output::print("  (none)", verbosity);
        }
        for entry in entries {
            output::result(model_line(&entry, entry.name == default));
        }
    }
    Ok(())
}

fn model_line(entry: &ModelEntry, is_default: bool) -> String {
    let mut line = format!("  - {}", entry.name);
    if let Some(vendor) = &entry.vendor {
        line.push_str(&format!(" ({})", vendor));
    }
    if is_default {
        line.push_str(" [default]");
    }
    line
}
