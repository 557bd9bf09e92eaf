//! runs command - Display runs as a lineage graph

use anyhow::Result;
use serde::Serialize;

use super::{open_engine, verbosity};
use crate::cli::args::LineageFormat;
use crate::core::graph::RenderFormat;
use crate::core::ledger::{Branch, Run};
use crate::engine::Context;
use crate::ui::output;

/// JSON shape of `dusk runs --json`.
#[derive(Debug, Serialize)]
struct LineageDump<'a> {
    runs: Vec<&'a Run>,
    branches: Vec<Branch>,
}

/// Render the lineage as a tree, a timeline, or JSON.
pub fn runs(ctx: &Context, tree: bool, json: bool, format: Option<LineageFormat>) -> Result<()> {
    let verbosity = verbosity(ctx);
    let (engine, _config) = open_engine(ctx)?;

    if json {
        let graph = engine.store().graph();
        return output::print_json(&LineageDump {
            runs: graph.chronological(),
            branches: graph.branch_summaries(),
        });
    }

    if engine.store().is_empty() {
        output::print("No runs yet.", verbosity);
        return Ok(());
    }

    let format = if tree {
        RenderFormat::Tree
    } else {
        format.map(RenderFormat::from).unwrap_or(RenderFormat::Timeline)
    };
    output::result(engine.render_lineage(format).trim_end());
    Ok(())
}
