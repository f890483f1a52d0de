//! Shared DTOs for the repoconf workspace.
//!
//! # Design constraints
//! - Declared config and observed state are read-only snapshots for a run.
//! - Changes are a closed set of variants; each one can describe itself without touching
//!   the remote repository.
//! - Prefer adding optional fields over changing semantics of serialized types.

pub mod apply;
pub mod cancel;
pub mod change;
pub mod config;
pub mod observed;
pub mod schema;

pub use cancel::{CancelToken, Cancelled};
pub use change::{Change, ChangeDomain, ChangeOp};
pub use config::DesiredConfig;
pub use schema::{LoadedSchema, SchemaLock};

/// File name of the schema lock file inside a configuration directory.
pub const LOCK_FILE_NAME: &str = "schema.lock.json";
