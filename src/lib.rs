//! Dusk - run prompts with reproducibility and inspectability
//!
//! Dusk records every prompt execution as a run in a local ledger. Runs form
//! a lineage: retries and branches point at the run they came from, so any
//! answer can be traced back, re-run with another model, and compared.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Intent surface and execution coordinator
//! - [`core`] - Domain types, the run ledger, lineage graph, comparison, config
//! - [`provider`] - Abstraction over model backends
//! - [`ui`] - User interaction utilities
//!
//! # Correctness Invariants
//!
//! Dusk maintains the following invariants:
//!
//! 1. A run is recorded before its provider is called
//! 2. A run settles at most once, from pending to success or failed
//! 3. Every parent reference points at a live run
//! 4. A failed mutation leaves the ledger as it was

pub mod cli;
pub mod core;
pub mod engine;
pub mod provider;
pub mod ui;
