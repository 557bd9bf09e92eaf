//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads configuration and opens the engine
//! 2. Resolves run ids and validates command-specific arguments
//! 3. Calls the engine to execute the intent
//! 4. Formats and displays output
//!
//! Handlers do NOT touch the ledger directly.
//!
//! # Async Commands
//!
//! Commands that call the model provider (run, retry, branch) are async.
//! [`block_on`] builds a tokio runtime for the duration of the command so
//! the rest of the CLI stays synchronous.

mod branch;
mod compare;
mod completion;
mod config_cmd;
mod delete;
mod explain;
mod history;
mod models;
mod retry;
mod run;
mod runs;
mod show;

// Re-export command functions for testing and direct invocation
pub use branch::branch;
pub use compare::compare;
pub use completion::completion;
pub use config_cmd::{get as config_get, list as config_list, set as config_set};
pub use delete::delete;
pub use explain::explain;
pub use history::history;
pub use models::models;
pub use retry::retry;
pub use run::run;
pub use runs::runs;
pub use show::show;

use std::future::Future;

use anyhow::{bail, Context as _, Result};

use crate::cli::args::{Command, ConfigAction};
use crate::core::config::Config;
use crate::core::ledger::Run;
use crate::core::types::RunStatus;
use crate::engine::{Context, Engine};
use crate::ui::output::{self, Verbosity};

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Run { prompt, model } => run::run(ctx, &prompt, model.as_deref()),
        Command::History {
            limit,
            filter,
            branch,
        } => history::history(ctx, limit, filter.as_deref(), branch.as_deref()),
        Command::Runs { tree, json, format } => runs::runs(ctx, tree, json, format),
        Command::Retry {
            id,
            model,
            same,
            prompt,
        } => retry::retry(ctx, &id, model, same, prompt),
        Command::Branch {
            id,
            name,
            model,
            prompt,
        } => branch::branch(ctx, &id, name, model, prompt),
        Command::Compare {
            left,
            right,
            format,
            diff,
        } => compare::compare(ctx, &left, &right, format, diff),
        Command::Explain { id, trace } => explain::explain(ctx, &id, trace),
        Command::Models { local, remote } => models::models(ctx, local, remote),
        Command::Show { id, full } => show::show(ctx, &id, full),
        Command::Delete {
            target,
            cascade,
            branch,
            force,
        } => delete::delete(ctx, &target, cascade, branch, force),
        Command::Config { action } => match action {
            ConfigAction::Get { key } => config_cmd::get(ctx, &key),
            ConfigAction::Set { key, value } => config_cmd::set(ctx, &key, &value),
            ConfigAction::List => config_cmd::list(ctx),
        },
        Command::Completion { shell } => completion::completion(shell),
    }
}

fn verbosity(ctx: &Context) -> Verbosity {
    Verbosity::from_flags(ctx.quiet, ctx.debug)
}

fn load_config() -> Result<Config> {
    Config::load().context("Failed to load config")
}

/// Load config and open the engine it describes.
fn open_engine(ctx: &Context) -> Result<(Engine, Config)> {
    let config = load_config()?;
    let engine = Engine::open(ctx, &config).context("Failed to open ledger")?;
    Ok((engine, config))
}

/// Run a future to completion on a fresh runtime.
fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    Ok(runtime.block_on(future))
}

/// Print a settled run; a failed run becomes an error after its output.
fn report_settled(run: &Run, verbosity: Verbosity) -> Result<()> {
    match run.status {
        RunStatus::Success => {
            output::print(
                format!(
                    "{} {} ({}) in {}",
                    output::status_marker(run.status),
                    run.id,
                    run.model,
                    output::format_duration(run.duration_ms)
                ),
                verbosity,
            );
            output::result(run.output.as_deref().unwrap_or_default());
            Ok(())
        }
        RunStatus::Failed => bail!(
            "run {} failed: {}",
            run.id,
            run.output.as_deref().unwrap_or("no output")
        ),
        RunStatus::Pending => {
            output::print(format!("{} is still pending", run.id), verbosity);
            Ok(())
        }
    }
}
