//! Port traits abstracting I/O away from the pipeline.

use repoconf_schemas::SchemaLockFile;
use repoconf_types::{Change, DesiredConfig};

/// Source of the declared configuration.
pub trait ConfigSource {
    fn load_config(&self) -> anyhow::Result<DesiredConfig>;
}

/// Persistence for the schema lock file. A missing lock file is `Ok(None)`.
pub trait LockStore {
    fn load_lock(&self) -> anyhow::Result<Option<SchemaLockFile>>;
    fn save_lock(&self, lock: &SchemaLockFile) -> anyhow::Result<()>;
}

/// Decides whether a described change list may be applied.
pub trait Confirm {
    fn confirm(&self, changes: &[Change]) -> anyhow::Result<bool>;
}
