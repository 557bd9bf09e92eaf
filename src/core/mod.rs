//! core
//!
//! Core domain types, the run ledger, and the pure algorithms over it.
//!
//! # Modules
//!
//! - [`types`] - Strong types: RunId, BranchName, RunStatus, UtcTimestamp
//! - [`ledger`] - Run records, storage backends and the run store
//! - [`graph`] - Lineage graph over runs and branch resolution
//! - [`compare`] - Line diffs and digests of run outputs
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Centralized path routing for ledger storage
//! - [`lock`] - Exclusive ledger lock
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Graph and comparison code is pure and deterministic

pub mod compare;
pub mod config;
pub mod graph;
pub mod ledger;
pub mod lock;
pub mod paths;
pub mod types;
