//! The schema lock file: which schema version and hash were last verified.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use fs_err as fs;
use repoconf_types::{LOCK_FILE_NAME, LoadedSchema, SchemaLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("missing lock file entry for {name:?}, run update")]
    Missing { name: String },

    #[error("lock file version mismatch for {name:?}, got {got} expected {expected}, run update")]
    VersionMismatch {
        name: String,
        got: String,
        expected: String,
    },

    #[error("lock file hash mismatch for {name:?}: got {got} expected {expected}")]
    HashMismatch {
        name: String,
        got: String,
        expected: String,
    },

    #[error("read lock file {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parse lock file {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("write lock file {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Path of the lock file inside a configuration directory.
pub fn lock_file_path(dir: &Utf8Path) -> Utf8PathBuf {
    dir.join(LOCK_FILE_NAME)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaLockFile {
    pub updated: DateTime<Utc>,

    #[serde(default)]
    pub schemas: BTreeMap<String, SchemaLock>,
}

impl SchemaLockFile {
    /// Snapshot exactly the given schemas. Earlier entries are not carried over.
    pub fn new(loaded: &[LoadedSchema]) -> Self {
        Self {
            updated: Utc::now(),
            schemas: loaded
                .iter()
                .map(|l| (l.lock.name.clone(), l.lock.clone()))
                .collect(),
        }
    }

    /// Load a lock file. A missing file is `Ok(None)`.
    pub fn load(path: &Utf8Path) -> Result<Option<Self>, LockError> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(LockError::Read {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };

        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| LockError::Parse {
                path: path.to_path_buf(),
                source: e,
            })
    }

    pub fn save(&self, path: &Utf8Path) -> Result<(), LockError> {
        let mut data = serde_json::to_vec_pretty(self).map_err(|e| LockError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        data.push(b'\n');

        fs::write(path, data).map_err(|e| LockError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn get(&self, name: &str) -> Option<&SchemaLock> {
        self.schemas.get(name)
    }

    /// Verify a freshly loaded schema against its lock entry.
    ///
    /// In init mode a missing entry or a different version is accepted, since the lock is
    /// about to be rewritten. The same version with different bytes is never accepted.
    pub fn check(&self, name: &str, loaded: &LoadedSchema, init: bool) -> Result<(), LockError> {
        let Some(lock) = self.schemas.get(name) else {
            if init {
                return Ok(());
            }
            return Err(LockError::Missing {
                name: name.to_string(),
            });
        };

        if loaded.lock.version != lock.version {
            if init {
                return Ok(());
            }
            return Err(LockError::VersionMismatch {
                name: name.to_string(),
                got: loaded.lock.version.clone(),
                expected: lock.version.clone(),
            });
        }

        if loaded.lock.hash != lock.hash {
            return Err(LockError::HashMismatch {
                name: name.to_string(),
                got: loaded.lock.hash.clone(),
                expected: lock.hash.clone(),
            });
        }

        Ok(())
    }
}
