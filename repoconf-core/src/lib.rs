//! Embeddable core library for repoconf.
//!
//! Provides a clap-free entry point that can be linked into other tools.
//!
//! # Port traits
//!
//! I/O around the pipeline is abstracted behind port traits in [`ports`]:
//! - [`ConfigSource`](ports::ConfigSource) for the declared configuration
//! - [`LockStore`](ports::LockStore) for the schema lock file
//! - [`Confirm`](ports::Confirm) for the go/no-go decision before applying
//!
//! The [`adapters`] module provides filesystem-backed and in-memory implementations, and
//! [`client::TwirpRepository`] talks to a live repository.
//!
//! # Entry points
//!
//! - [`run_update`](pipeline::run_update): refresh the schema lock file
//! - [`run_plan`](pipeline::run_plan): compute the change list
//! - [`run_apply`](pipeline::run_apply): compute, confirm and apply the change list

pub mod adapters;
pub mod client;
pub mod config;
pub mod pipeline;
pub mod ports;
pub mod settings;

// Re-exports so embedders don't need the inner crates directly.
pub use repoconf_domain::{ApiError, MemoryRepository, RepositoryApi};
pub use repoconf_types::{CancelToken, Change, DesiredConfig};
