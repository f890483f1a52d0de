//! The update, plan and apply pipelines, free of any CLI concerns.

use crate::ports::{ConfigSource, Confirm, LockStore};
use crate::settings::{ApplySettings, CacheSettings, UpdateSettings};
use anyhow::Context;
use repoconf_apply::{ApplyOptions, apply_changes};
use repoconf_domain::{DiffContext, PlanError, Planner, RepositoryApi};
use repoconf_schemas::{SchemaCache, SchemaLoadError, SchemaLockFile, load_schema_sets};
use repoconf_types::apply::ApplyRecord;
use repoconf_types::{CancelToken, Change, ChangeDomain, DesiredConfig, LoadedSchema};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("aborted by user")]
    Aborted,

    #[error("operation cancelled")]
    Cancelled,

    #[error("apply {domain} change {index} ({headline}): {message}")]
    PartiallyApplied {
        index: usize,
        domain: ChangeDomain,
        headline: String,
        message: String,
    },

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ToolError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            ToolError::PartiallyApplied { .. } => 2,
            _ => 1,
        }
    }
}

/// Outcome of `run_update`.
#[derive(Debug)]
pub struct UpdateOutcome {
    pub lock: SchemaLockFile,
}

/// Outcome of `run_plan`.
#[derive(Debug)]
pub struct PlanOutcome {
    pub changes: Vec<Change>,
    pub schemas: Vec<LoadedSchema>,
}

/// Outcome of `run_apply`.
#[derive(Debug)]
pub struct ApplyOutcome {
    pub changes: Vec<Change>,

    /// `None` when there was nothing to apply.
    pub record: Option<ApplyRecord>,
}

impl ApplyOutcome {
    /// `Err` when the run stopped at a failing change.
    pub fn check(&self, cancel: &CancelToken) -> Result<(), ToolError> {
        let Some(failed) = self.record.as_ref().and_then(ApplyRecord::failure) else {
            return Ok(());
        };
        if cancel.is_cancelled() {
            return Err(ToolError::Cancelled);
        }
        Err(ToolError::PartiallyApplied {
            index: failed.index,
            domain: failed.domain,
            headline: failed.headline.clone(),
            message: failed.message.clone().unwrap_or_default(),
        })
    }
}

/// Open the schema cache the settings ask for. An unusable default cache is skipped.
pub fn open_cache(settings: &CacheSettings) -> anyhow::Result<Option<SchemaCache>> {
    match settings {
        CacheSettings::Disabled => Ok(None),
        CacheSettings::Dir(dir) => SchemaCache::open(dir.clone())
            .map(Some)
            .with_context(|| format!("open schema cache {dir}")),
        CacheSettings::Default => {
            let Some(dir) = SchemaCache::default_dir() else {
                debug!("no user cache directory, schema cache disabled");
                return Ok(None);
            };
            match SchemaCache::open(dir.clone()) {
                Ok(cache) => Ok(Some(cache)),
                Err(e) => {
                    warn!(dir = %dir, error = %e, "schema cache disabled");
                    Ok(None)
                }
            }
        }
    }
}

/// Load every schema set afresh and rewrite the lock file from what was loaded.
pub fn run_update(
    settings: &UpdateSettings,
    config_src: &dyn ConfigSource,
    locks: &dyn LockStore,
    cancel: &CancelToken,
) -> Result<UpdateOutcome, ToolError> {
    let config = config_src.load_config()?;
    let cache = open_cache(&settings.cache)?;
    let previous = locks.load_lock()?;

    let loaded = load_schema_sets(
        cancel,
        &config.schema_sets,
        previous.as_ref(),
        true,
        cache.as_ref(),
    )
    .map_err(|e| cancelled_or(cancel, e))?;

    let lock = SchemaLockFile::new(&loaded);
    locks.save_lock(&lock).context("save lock file")?;
    info!(schemas = loaded.len(), "lock file updated");

    Ok(UpdateOutcome { lock })
}

/// Compute the change list that would bring the repository in line with the configuration.
pub fn run_plan(
    settings: &ApplySettings,
    config_src: &dyn ConfigSource,
    locks: &dyn LockStore,
    api: &dyn RepositoryApi,
    cancel: &CancelToken,
) -> Result<PlanOutcome, ToolError> {
    let config = config_src.load_config()?;
    let schemas = load_locked_schemas(&settings.cache, &config, locks, cancel)?;

    let ctx = DiffContext {
        cancel,
        config: &config,
        schemas: &schemas,
    };
    let changes = Planner::new().plan(&ctx, api).map_err(|e| match e {
        PlanError::Cancelled => ToolError::Cancelled,
        e => ToolError::Internal(anyhow::Error::new(e)),
    })?;
    info!(changes = changes.len(), "plan computed");

    Ok(PlanOutcome { changes, schemas })
}

/// Plan, ask for confirmation, then apply.
///
/// An empty plan is never confirmed. A dry run is applied without confirmation since nothing
/// reaches the repository.
pub fn run_apply(
    settings: &ApplySettings,
    config_src: &dyn ConfigSource,
    locks: &dyn LockStore,
    api: &dyn RepositoryApi,
    confirm: &dyn Confirm,
    cancel: &CancelToken,
) -> Result<ApplyOutcome, ToolError> {
    let PlanOutcome { changes, .. } = run_plan(settings, config_src, locks, api, cancel)?;

    if changes.is_empty() {
        return Ok(ApplyOutcome {
            changes,
            record: None,
        });
    }

    if !settings.dry_run {
        let approved = match confirm.confirm(&changes) {
            Ok(approved) => approved,
            Err(_) if cancel.is_cancelled() => return Err(ToolError::Cancelled),
            Err(e) => return Err(e.context("confirm changes").into()),
        };
        if !approved {
            return Err(ToolError::Aborted);
        }
    }
    if cancel.is_cancelled() {
        return Err(ToolError::Cancelled);
    }

    let opts = ApplyOptions {
        dry_run: settings.dry_run,
    };
    let record = apply_changes(cancel, api, &changes, &opts);

    Ok(ApplyOutcome {
        changes,
        record: Some(record),
    })
}

fn load_locked_schemas(
    cache: &CacheSettings,
    config: &DesiredConfig,
    locks: &dyn LockStore,
    cancel: &CancelToken,
) -> Result<Vec<LoadedSchema>, ToolError> {
    let cache = open_cache(cache)?;
    let lock = locks.load_lock()?;

    load_schema_sets(
        cancel,
        &config.schema_sets,
        lock.as_ref(),
        false,
        cache.as_ref(),
    )
    .map_err(|e| cancelled_or(cancel, e))
}

fn cancelled_or(cancel: &CancelToken, e: SchemaLoadError) -> ToolError {
    if cancel.is_cancelled() {
        return ToolError::Cancelled;
    }
    ToolError::Internal(anyhow::Error::new(e).context("load schemas"))
}
