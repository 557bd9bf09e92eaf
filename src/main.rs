//! dusk binary entry point.

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use dusk::cli::{self, Cli};
use dusk::ui::output;

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "DUSK_LOG";

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    let result = cli::run(cli);
    if let Err(err) = &result {
        output::error(format!("{:#}", err));
    }
    ExitCode::from(cli::exit_code(&result) as u8)
}

/// Install a stderr fmt subscriber; `DUSK_LOG` wins over `--debug`.
fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
