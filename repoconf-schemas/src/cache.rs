//! Local schema cache keyed by logical URL and verified by hash on every read.
//!
//! Layout: `<root>/<scheme>/<host>/<path segments...>` holds the artifact and a sibling
//! `<...>.info` JSON file records `{url, hash}`. A store removes the old info file, writes the
//! artifact, then writes the new info file, so an interrupted store reads back as a miss.

use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use repoconf_hash::sha256_hex;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("invalid cache URL {url:?}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("invalid cache info file {path}: {message}")]
    InvalidInfo { path: Utf8PathBuf, message: String },

    #[error("cached schema hash mismatch: got {recorded} expected {expected}")]
    HashMismatch { recorded: String, expected: String },

    #[error("cached schema {path} didn't match the stored or requested hash")]
    Corrupted { path: Utf8PathBuf },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CacheEntry {
    url: String,
    hash: String,
}

#[derive(Debug, Clone)]
pub struct SchemaCache {
    dir: Utf8PathBuf,
}

impl SchemaCache {
    /// Open (and create) a cache rooted at `dir`.
    pub fn open(dir: impl Into<Utf8PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| CacheError::Io {
            context: format!("create schema cache dir {dir}"),
            source: e,
        })?;
        Ok(Self { dir })
    }

    /// `repoconf/schema_cache` under the per-user cache directory, if one can be found.
    pub fn default_dir() -> Option<Utf8PathBuf> {
        let base = Utf8PathBuf::from_path_buf(dirs::cache_dir()?).ok()?;
        Some(base.join("repoconf").join("schema_cache"))
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Read a cached artifact.
    ///
    /// `Ok(None)` means nothing is cached for `logical_url`. A cached entry whose hash does
    /// not match `expected_hash`, or whose bytes no longer match the recorded hash, is an
    /// error rather than a miss.
    pub fn read(
        &self,
        asset_url: &str,
        logical_url: &str,
        expected_hash: &str,
    ) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.entry_path(logical_url)?;
        let info_path = info_path(&path);

        let info = match fs::read(&info_path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(url = logical_url, "schema cache miss");
                return Ok(None);
            }
            Err(e) => {
                return Err(CacheError::Io {
                    context: "read cache info file".to_string(),
                    source: e,
                });
            }
        };

        let entry: CacheEntry =
            serde_json::from_slice(&info).map_err(|e| CacheError::InvalidInfo {
                path: info_path.clone(),
                message: e.to_string(),
            })?;

        if entry.hash != expected_hash {
            return Err(CacheError::HashMismatch {
                recorded: entry.hash,
                expected: expected_hash.to_string(),
            });
        }

        let data = fs::read(&path).map_err(|e| CacheError::Io {
            context: "read cached schema".to_string(),
            source: e,
        })?;

        if sha256_hex(&data) != entry.hash {
            return Err(CacheError::Corrupted { path });
        }

        debug!(url = logical_url, asset = asset_url, "schema cache hit");
        Ok(Some(data))
    }

    pub fn store(
        &self,
        asset_url: &str,
        logical_url: &str,
        hash: &str,
        data: &[u8],
    ) -> Result<(), CacheError> {
        let path = self.entry_path(logical_url)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CacheError::Io {
                context: "create cache entry directory".to_string(),
                source: e,
            })?;
        }

        let entry = CacheEntry {
            url: asset_url.to_string(),
            hash: hash.to_string(),
        };
        let info_path = info_path(&path);
        let info = serde_json::to_vec_pretty(&entry).map_err(|e| CacheError::InvalidInfo {
            path: info_path.clone(),
            message: e.to_string(),
        })?;

        match fs::remove_file(&info_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CacheError::Io {
                    context: "remove stale cache info file".to_string(),
                    source: e,
                });
            }
        }
        fs::write(&path, data).map_err(|e| CacheError::Io {
            context: "write cached schema".to_string(),
            source: e,
        })?;
        fs::write(&info_path, info).map_err(|e| CacheError::Io {
            context: "write cache info file".to_string(),
            source: e,
        })?;

        debug!(url = logical_url, bytes = data.len(), "stored schema in cache");
        Ok(())
    }

    fn entry_path(&self, logical_url: &str) -> Result<Utf8PathBuf, CacheError> {
        let invalid = |message: &str| CacheError::InvalidUrl {
            url: logical_url.to_string(),
            message: message.to_string(),
        };

        let url = Url::parse(logical_url).map_err(|e| invalid(&e.to_string()))?;
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;

        let mut path = self.dir.join(url.scheme());
        match url.port() {
            Some(port) => path.push(format!("{host}_{port}")),
            None => path.push(host),
        }

        let mut segments = 0;
        for segment in url.path_segments().into_iter().flatten() {
            if segment.is_empty() {
                continue;
            }
            if segment == "." || segment == ".." {
                return Err(invalid("relative path segment"));
            }
            path.push(segment);
            segments += 1;
        }
        if segments == 0 {
            path.push("index");
        }

        Ok(path)
    }
}

fn info_path(path: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{path}.info"))
}
