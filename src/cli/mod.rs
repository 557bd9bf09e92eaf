//! cli
//!
//! Command-line interface layer for dusk.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Delegate to command handlers
//! - Map failures to exit codes
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to the
//! [`crate::engine`] for execution. All ledger changes flow through the
//! engine's intents.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use anyhow::Result;

use crate::core::ledger::LedgerError;
use crate::engine::{self, EngineError};

/// Exit code for a successful command.
pub const EXIT_OK: i32 = 0;
/// Exit code for validation and other errors.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code when a run or branch does not exist.
pub const EXIT_NOT_FOUND: i32 = 2;

/// Run the CLI application with already-parsed arguments.
///
/// This is the main entry point called from `main.rs`.
pub fn run(cli: Cli) -> Result<()> {
    let ctx = engine::Context {
        data_dir: cli.data_dir.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
        interactive: cli.interactive(),
    };

    commands::dispatch(cli.command, &ctx)
}

/// Exit code for a command's outcome.
pub fn exit_code(result: &Result<()>) -> i32 {
    let Err(err) = result else {
        return EXIT_OK;
    };
    let not_found = err.chain().any(|cause| {
        let ledger = cause.downcast_ref::<LedgerError>().or_else(|| {
            match cause.downcast_ref::<EngineError>() {
                Some(EngineError::Ledger(e)) => Some(e),
                _ => None,
            }
        });
        ledger.is_some_and(LedgerError::is_not_found)
    });
    if not_found {
        EXIT_NOT_FOUND
    } else {
        EXIT_FAILURE
    }
}
