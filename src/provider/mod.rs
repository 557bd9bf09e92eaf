//! provider
//!
//! Abstraction for model providers.
//!
//! # Architecture
//!
//! The `ModelProvider` trait is the only way the execution coordinator talks
//! to a model. Commands use the [`create_provider`] factory rather than
//! constructing providers directly, so tests can inject a deterministic
//! [`mock::MockProvider`].
//!
//! - Provider calls are made only after the pending run is recorded
//! - Provider failures are recorded on the run, never raised to the caller
//!
//! # Modules
//!
//! - `traits`: Core `ModelProvider` trait and request/response types
//! - [`command`]: Runs a local executable per call
//! - [`echo`]: Offline deterministic provider
//! - [`mock`]: Scripted implementation for deterministic testing
//! - `factory`: Provider selection and creation
//!
//! # Example
//!
//! ```
//! use dusk::provider::{echo::EchoProvider, ModelProvider, ProviderRequest};
//!
//! # tokio_test::block_on(async {
//! let provider = EchoProvider::new();
//! let response = provider
//!     .submit(&ProviderRequest::new("hello", "gpt-4"))
//!     .await
//!     .unwrap();
//! assert_eq!(response.output, "[gpt-4] hello");
//! # });
//! ```

pub mod command;
pub mod echo;
mod factory;
pub mod mock;
mod traits;

pub use factory::{create_provider, valid_provider_names, ProviderKind};
pub use traits::*;
