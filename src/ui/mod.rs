//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`prompts`] - Interactive prompts and confirmations
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All user-facing output and prompts go through this module to ensure
//! consistent formatting and proper handling of interactive vs
//! non-interactive modes.

pub mod output;
pub mod prompts;
