//! Domain logic: compare declared configuration with the live repository and produce an
//! ordered list of changes.
//!
//! This crate owns *what* should change. Executing changes is the `repoconf-apply` crate.

mod differs;
mod memory;
mod planner;
mod ports;

pub use differs::{
    Delta, DiffContext, DiffError, Differ, builtin_differs, normalize_version, set_diff,
};
pub use memory::{MemoryRepository, RecordedCall};
pub use planner::{PlanError, Planner};
pub use ports::{ApiError, RepositoryApi};
