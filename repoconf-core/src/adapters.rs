//! Default port implementations.

use crate::config::read_config_dir;
use crate::ports::{ConfigSource, Confirm, LockStore};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use repoconf_schemas::{SchemaLockFile, lock_file_path};
use repoconf_types::{Change, DesiredConfig};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Reads `*.toml` configuration files from a directory.
#[derive(Debug, Clone)]
pub struct FsConfigSource {
    pub dir: Utf8PathBuf,
}

impl FsConfigSource {
    pub fn new(dir: Utf8PathBuf) -> Self {
        Self { dir }
    }
}

impl ConfigSource for FsConfigSource {
    fn load_config(&self) -> anyhow::Result<DesiredConfig> {
        read_config_dir(&self.dir).with_context(|| format!("read configuration from {}", self.dir))
    }
}

/// The lock file inside a configuration directory.
#[derive(Debug, Clone)]
pub struct FsLockStore {
    path: Utf8PathBuf,
}

impl FsLockStore {
    pub fn new(config_dir: &Utf8Path) -> Self {
        Self {
            path: lock_file_path(config_dir),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl LockStore for FsLockStore {
    fn load_lock(&self) -> anyhow::Result<Option<SchemaLockFile>> {
        SchemaLockFile::load(&self.path).context("load lock file")
    }

    fn save_lock(&self, lock: &SchemaLockFile) -> anyhow::Result<()> {
        debug!(path = %self.path, schemas = lock.schemas.len(), "writing lock file");
        lock.save(&self.path).context("save lock file")
    }
}

/// In-memory configuration for embedding and testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfigSource {
    config: DesiredConfig,
}

impl InMemoryConfigSource {
    pub fn new(config: DesiredConfig) -> Self {
        Self { config }
    }
}

impl ConfigSource for InMemoryConfigSource {
    fn load_config(&self) -> anyhow::Result<DesiredConfig> {
        self.config.validate().context("invalid configuration")?;
        Ok(self.config.clone())
    }
}

/// In-memory lock file for embedding and testing.
#[derive(Debug, Default)]
pub struct InMemoryLockStore {
    lock: Mutex<Option<SchemaLockFile>>,
}

impl InMemoryLockStore {
    pub fn new(lock: Option<SchemaLockFile>) -> Self {
        Self {
            lock: Mutex::new(lock),
        }
    }

    /// The lock file as last saved (or as constructed).
    pub fn current(&self) -> Option<SchemaLockFile> {
        self.lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LockStore for InMemoryLockStore {
    fn load_lock(&self) -> anyhow::Result<Option<SchemaLockFile>> {
        Ok(self.current())
    }

    fn save_lock(&self, lock: &SchemaLockFile) -> anyhow::Result<()> {
        *self.lock.lock().unwrap_or_else(PoisonError::into_inner) = Some(lock.clone());
        Ok(())
    }
}

/// A fixed answer, for `--yes` and for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedConfirm(pub bool);

impl Confirm for FixedConfirm {
    fn confirm(&self, _changes: &[Change]) -> anyhow::Result<bool> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repoconf_types::{LoadedSchema, SchemaLock};
    use tempfile::TempDir;

    #[test]
    fn fs_lock_store_round_trips() {
        let temp = TempDir::new().expect("temp dir");
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        let store = FsLockStore::new(&dir);
        assert!(store.load_lock().expect("load").is_none());

        let lock = SchemaLockFile::new(&[LoadedSchema {
            lock: SchemaLock {
                name: "core".to_string(),
                url: "https://schemas.example.com/core.json".to_string(),
                version: "v1.0.0".to_string(),
                hash: "ab".repeat(32),
            },
            data: Vec::new(),
        }]);
        store.save_lock(&lock).expect("save");

        assert_eq!(store.path(), dir.join("schema.lock.json"));
        assert_eq!(store.load_lock().expect("load"), Some(lock));
    }

    #[test]
    fn in_memory_config_is_validated() {
        let config: DesiredConfig = toml::from_str(
            "[[metric]]\nkind = \"charcount\"\n\n[[metric]]\nkind = \"charcount\"\n",
        )
        .expect("parse");

        let err = InMemoryConfigSource::new(config).load_config().unwrap_err();
        assert!(format!("{err:#}").contains("metric kind \"charcount\" is declared more than once"));
    }
}
