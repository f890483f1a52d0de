use crate::cache::{CacheError, SchemaCache};
use crate::lock::{LockError, SchemaLockFile};
use crate::source::{SchemaSource, SourceError, open_source};
use repoconf_types::config::{ConfigError, SchemaSet};
use repoconf_types::{CancelToken, LoadedSchema, SchemaLock};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Error)]
pub enum SchemaLoadError {
    #[error("missing lock file, run update")]
    MissingLockFile,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("open source for schema set {set:?}: {source}")]
    Source {
        set: String,
        #[source]
        source: SourceError,
    },

    #[error("load schema {name:?}: {source}")]
    Schema {
        name: String,
        #[source]
        source: SourceError,
    },

    #[error("schema cache for {name:?}: {source}")]
    Cache {
        name: String,
        #[source]
        source: CacheError,
    },

    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Load every schema of every set, in declaration order.
pub fn load_schema_sets(
    cancel: &CancelToken,
    sets: &[SchemaSet],
    lockfile: Option<&SchemaLockFile>,
    init: bool,
    cache: Option<&SchemaCache>,
) -> Result<Vec<LoadedSchema>, SchemaLoadError> {
    let mut loaded = Vec::new();
    for set in sets {
        loaded.extend(load_schema_set(cancel, set, lockfile, init, cache)?);
    }
    Ok(loaded)
}

/// Load the schemas of one set and check each against the lock file.
///
/// Outside init mode the lock file is required. HTTP schemas whose locked version matches the
/// set version are served from `cache` when a verified copy exists.
pub fn load_schema_set(
    cancel: &CancelToken,
    set: &SchemaSet,
    lockfile: Option<&SchemaLockFile>,
    init: bool,
    cache: Option<&SchemaCache>,
) -> Result<Vec<LoadedSchema>, SchemaLoadError> {
    if lockfile.is_none() && !init {
        return Err(SchemaLoadError::MissingLockFile);
    }

    let locator = set.locator()?;
    info!(set = %set.name, version = %set.version, "loading schema set");

    let source =
        open_source(cancel, locator, &set.version).map_err(|e| SchemaLoadError::Source {
            set: set.name.clone(),
            source: e,
        })?;

    let mut list = Vec::with_capacity(set.schemas.len());
    for name in &set.schemas {
        let locked = lockfile
            .and_then(|l| l.get(name))
            .filter(|l| !init && l.version == set.version);

        let schema = load_one(cancel, source.as_ref(), name, locked, cache)?;

        if let Some(lockfile) = lockfile {
            lockfile.check(name, &schema, init)?;
        }

        list.push(schema);
    }

    Ok(list)
}

fn load_one(
    cancel: &CancelToken,
    source: &dyn SchemaSource,
    name: &str,
    locked: Option<&SchemaLock>,
    cache: Option<&SchemaCache>,
) -> Result<LoadedSchema, SchemaLoadError> {
    let schema_err = |e: SourceError| SchemaLoadError::Schema {
        name: name.to_string(),
        source: e,
    };
    let cache_err = |e: CacheError| SchemaLoadError::Cache {
        name: name.to_string(),
        source: e,
    };

    let asset = match (cache, source.asset_url(name).map_err(schema_err)?) {
        (Some(cache), Some(asset)) => Some((cache, asset)),
        _ => None,
    };

    let Some((cache, asset)) = asset else {
        return source.load_schema(cancel, name).map_err(schema_err);
    };

    let logical = Url::parse(&asset)
        .map(|u| crate::source::logical_url(&u))
        .map_err(|e| {
            cache_err(CacheError::InvalidUrl {
                url: asset.clone(),
                message: e.to_string(),
            })
        })?;

    if let Some(lock) = locked
        && let Some(data) = cache.read(&asset, &logical, &lock.hash).map_err(cache_err)?
    {
        debug!(schema = name, version = %lock.version, "using cached schema");
        return Ok(LoadedSchema {
            lock: SchemaLock {
                name: name.to_string(),
                url: logical,
                version: lock.version.clone(),
                hash: lock.hash.clone(),
            },
            data,
        });
    }

    let schema = source.load_schema(cancel, name).map_err(schema_err)?;
    cache
        .store(&asset, &logical, &schema.lock.hash, &schema.data)
        .map_err(cache_err)?;
    Ok(schema)
}
