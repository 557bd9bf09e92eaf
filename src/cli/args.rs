//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--data-dir <path>`: Use this ledger directory
//! - `--debug`: Enable debug logging
//! - `--no-interactive`: Never prompt
//! - `--quiet` / `-q`: Minimal output

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::core::compare::CompareMode;
use crate::core::graph::RenderFormat;

/// Dusk - run prompts with reproducibility and inspectability
#[derive(Parser, Debug)]
#[command(name = "dusk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Ledger data directory (overrides DUSK_DATA_DIR and config)
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; implies --no-interactive
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable interactive prompts
    #[arg(long, global = true)]
    pub no_interactive: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Determine if interactive mode is enabled.
    ///
    /// Interactive unless `--no-interactive` or `--quiet` was set, and only
    /// when stdin is a terminal.
    pub fn interactive(&self) -> bool {
        !(self.no_interactive || self.quiet) && std::io::stdin().is_terminal()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a prompt against a model
    #[command(
        name = "run",
        long_about = "Run a prompt against a model and record the result.\n\n\
            The run is recorded as pending before the provider is called, then \
            settled as success or failed. Failed provider calls are still recorded; \
            the command exits non-zero after printing the failure.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Use the default model
    dusk run \"Explain React hooks\"

    # Pick a model
    dusk run \"Write a CLI tool\" -m claude-3-opus"
    )]
    Run {
        /// Prompt text
        prompt: String,

        /// Model to run (defaults to config default_model)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List recent runs, newest first
    #[command(name = "history")]
    History {
        /// Maximum number of runs to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Only show runs with this status (success, failed, pending)
        #[arg(short, long, value_name = "STATUS")]
        filter: Option<String>,

        /// Only show runs on this branch
        #[arg(short, long)]
        branch: Option<String>,
    },

    /// Display runs as a lineage graph
    #[command(
        name = "runs",
        long_about = "Display every run with its lineage.\n\n\
            The timeline view lists runs in creation order with their branch. The \
            tree view groups root runs by branch and nests retries and branches \
            under the run they came from.",
        after_help = "\
READING THE TREE:
    main
    ├── 1a2b3c4d (gpt-4) success \"Explain React hooks\"
    │   ├── 5e6f7a8b (gpt-4) success \"Explain React hooks\"
    │   └── 9c0d1e2f (claude-3) success \"...\" [branch: exp]
    └── 3a4b5c6d (gpt-4) failed \"Write a CLI tool\""
    )]
    Runs {
        /// Tree view (same as --format tree)
        #[arg(long, conflicts_with = "format")]
        tree: bool,

        /// Machine-readable runs and branches
        #[arg(long)]
        json: bool,

        /// Layout of the text view
        #[arg(long, value_enum)]
        format: Option<LineageFormat>,
    },

    /// Re-run a run on its own branch
    #[command(
        name = "retry",
        long_about = "Re-run a previous run as its child on the same branch.\n\n\
            The prompt and model are inherited unless overridden.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Same prompt, same model
    dusk retry 1a2b3c4d

    # Same prompt, different model
    dusk retry 1a2b3c4d -m claude-3-opus

    # Tweak the prompt
    dusk retry 1a2b3c4d -p \"Explain React hooks briefly\""
    )]
    Retry {
        /// Run id or unique prefix
        id: String,

        /// Model for the new run
        #[arg(short, long, conflicts_with = "same")]
        model: Option<String>,

        /// Keep the source run's model
        #[arg(long)]
        same: bool,

        /// Prompt for the new run
        #[arg(short, long)]
        prompt: Option<String>,
    },

    /// Start a new branch from a run
    #[command(
        name = "branch",
        long_about = "Create a named branch starting at a new child of the given run.\n\n\
            Later retries of runs on the branch stay on it. Without --name a \
            timestamped name is generated."
    )]
    Branch {
        /// Run id or unique prefix
        id: String,

        /// Branch name
        #[arg(short, long)]
        name: Option<String>,

        /// Model for the new run
        #[arg(short, long)]
        model: Option<String>,

        /// Prompt for the new run
        #[arg(short, long)]
        prompt: Option<String>,
    },

    /// Compare the outputs of two runs
    #[command(
        name = "compare",
        after_help = "\
WORKFLOW EXAMPLES:
    # Side by side (default)
    dusk compare 1a2b3c4d 5e6f7a8b

    # Line diff
    dusk compare 1a2b3c4d 5e6f7a8b -d

    # For scripts
    dusk compare 1a2b3c4d 5e6f7a8b -f json"
    )]
    Compare {
        /// First run id or prefix
        left: String,

        /// Second run id or prefix
        right: String,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<CompareFormat>,

        /// Line-by-line diff (same as --format unified)
        #[arg(short, long, conflicts_with = "format")]
        diff: bool,
    },

    /// Explain how a run came to be
    #[command(name = "explain")]
    Explain {
        /// Run id or unique prefix
        id: String,

        /// Show the full ancestor chain with prompts
        #[arg(long)]
        trace: bool,
    },

    /// List configured models
    #[command(name = "models")]
    Models {
        /// Only local models
        #[arg(long, conflicts_with = "remote")]
        local: bool,

        /// Only remote models
        #[arg(long)]
        remote: bool,
    },

    /// Show a run's details
    #[command(name = "show")]
    Show {
        /// Run id or unique prefix
        id: String,

        /// Show the complete output
        #[arg(long)]
        full: bool,
    },

    /// Delete a run or a branch
    #[command(
        name = "delete",
        long_about = "Delete a run, its subtree, or a whole branch.\n\n\
            A run with children can only be deleted with --cascade. With --branch \
            the argument names a branch (or a run whose branch should go) and every \
            run on that branch is removed. The default branch cannot be deleted.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Delete a leaf run
    dusk delete 1a2b3c4d

    # Delete a run and everything derived from it
    dusk delete 1a2b3c4d --cascade --force

    # Delete a branch
    dusk delete exp --branch"
    )]
    Delete {
        /// Run id, prefix, or branch name with --branch
        target: String,

        /// Also delete descendants
        #[arg(long)]
        cascade: bool,

        /// Delete the branch instead of a single run
        #[arg(short, long)]
        branch: bool,

        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Get, set, or list configuration values
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    dusk completion bash >> ~/.bashrc

    # Zsh
    dusk completion zsh > ~/.zfunc/_dusk

    # Fish
    dusk completion fish > ~/.config/fish/completions/dusk.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Value to set
        value: String,
    },
    /// List all configuration values
    List,
}

/// Supported shells for completion.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// `--format` values for `dusk runs`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LineageFormat {
    Tree,
    Timeline,
}

impl From<LineageFormat> for RenderFormat {
    fn from(format: LineageFormat) -> Self {
        match format {
            LineageFormat::Tree => RenderFormat::Tree,
            LineageFormat::Timeline => RenderFormat::Timeline,
        }
    }
}

/// `--format` values for `dusk compare`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CompareFormat {
    SideBySide,
    Unified,
    Json,
}

impl From<CompareFormat> for CompareMode {
    fn from(format: CompareFormat) -> Self {
        match format {
            CompareFormat::SideBySide => CompareMode::SideBySide,
            CompareFormat::Unified => CompareMode::Unified,
            CompareFormat::Json => CompareMode::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("dusk").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_anywhere() {
        let cli = parse(&["history", "--data-dir", "/tmp/d", "-q"]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/d")));
        assert!(cli.quiet);
        assert!(!cli.interactive());
    }

    #[test]
    fn history_defaults() {
        match parse(&["history"]).command {
            Command::History {
                limit,
                filter,
                branch,
            } => {
                assert_eq!(limit, 10);
                assert!(filter.is_none());
                assert!(branch.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn retry_same_conflicts_with_model() {
        let result = Cli::try_parse_from(["dusk", "retry", "abc", "--same", "-m", "gpt-4"]);
        assert!(result.is_err());
    }

    #[test]
    fn compare_formats() {
        match parse(&["compare", "a", "b", "-f", "side-by-side"]).command {
            Command::Compare { format, diff, .. } => {
                assert_eq!(format, Some(CompareFormat::SideBySide));
                assert!(!diff);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(Cli::try_parse_from(["dusk", "compare", "a", "b", "-d", "-f", "json"]).is_err());
    }

    #[test]
    fn runs_tree_conflicts_with_format() {
        assert!(Cli::try_parse_from(["dusk", "runs", "--tree", "--format", "timeline"]).is_err());
        match parse(&["runs", "--format", "tree"]).command {
            Command::Runs { format, .. } => assert_eq!(format, Some(LineageFormat::Tree)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn delete_flags() {
        match parse(&["delete", "exp", "-b", "-f"]).command {
            Command::Delete {
                target,
                branch,
                force,
                cascade,
            } => {
                assert_eq!(target, "exp");
                assert!(branch && force && !cascade);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
