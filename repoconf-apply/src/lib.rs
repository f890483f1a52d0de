//! Change executor.
//!
//! Responsibilities:
//! - Execute one change against the repository (`execute_change`).
//! - Apply a confirmed change list strictly in order, stopping at the first failure and
//!   recording what was applied, what failed and what never ran (`apply_changes`).
//!
//! There is no rollback: changes applied before a failure stay applied.

mod error;

pub use error::ExecuteError;

use chrono::Utc;
use error::remote;
use repoconf_domain::RepositoryApi;
use repoconf_types::apply::{ApplyRecord, ApplyResult, ApplyStatus};
use repoconf_types::change::{MetaTypeChange, MetricChange, SchemaChange, WorkflowChange};
use repoconf_types::{CancelToken, Change, LoadedSchema};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Record every change as skipped without calling the repository.
    pub dry_run: bool,
}

/// Execute a single change.
pub fn execute_change(
    cancel: &CancelToken,
    api: &dyn RepositoryApi,
    change: &Change,
) -> Result<(), ExecuteError> {
    cancel.check()?;

    match change {
        Change::Schema(sc) => execute_schema(api, sc),
        Change::MetaType(mc) => match mc {
            MetaTypeChange::Register { meta_type } => api
                .register_meta_type(meta_type)
                .map_err(remote("register meta type")),
            MetaTypeChange::RegisterUse {
                main_type,
                meta_type,
            } => api
                .register_meta_type_use(main_type, meta_type)
                .map_err(remote("register meta type use")),
            MetaTypeChange::Unregister { .. } => Err(ExecuteError::Unsupported {
                action: "unregister meta types".to_string(),
            }),
            MetaTypeChange::UnregisterUse { .. } => Err(ExecuteError::Unsupported {
                action: "unregister meta type use".to_string(),
            }),
        },
        Change::Status(s) => api
            .update_status(&s.doc_type, &s.status, s.disable)
            .map_err(remote("update status in repository")),
        Change::Workflow(wc) => match wc {
            WorkflowChange::Add {
                doc_type, wanted, ..
            }
            | WorkflowChange::Update {
                doc_type, wanted, ..
            } => api
                .set_workflow(doc_type, wanted)
                .map_err(remote("set workflow")),
            WorkflowChange::Remove { doc_type, .. } => api
                .delete_workflow(doc_type)
                .map_err(remote("delete workflow")),
        },
        Change::Metric(mc) => match mc {
            MetricChange::Add { kind, aggregation }
            | MetricChange::Update {
                kind,
                to: aggregation,
                ..
            } => api
                .register_metric_kind(kind, *aggregation)
                .map_err(remote("update metric kind")),
            MetricChange::Remove { kind } => api
                .delete_metric_kind(kind)
                .map_err(remote("delete metric kind")),
        },
        Change::TypeConfig(tc) => api
            .configure_type(&tc.doc_type, &tc.wanted)
            .map_err(remote("configure type")),
    }
}

fn execute_schema(api: &dyn RepositoryApi, change: &SchemaChange) -> Result<(), ExecuteError> {
    let schema = match change {
        SchemaChange::Deactivate { name, .. } => {
            return api
                .deactivate_schema(name)
                .map_err(remote("deactivate schema"));
        }
        SchemaChange::Activate { schema }
        | SchemaChange::Upgrade { schema, .. }
        | SchemaChange::Downgrade { schema, .. } => schema,
    };

    let spec = schema_spec(schema)?;
    match api.register_schema(schema.name(), schema.version(), spec, true) {
        Ok(()) => Ok(()),
        Err(e) if e.is_failed_precondition() => {
            debug!(
                schema = schema.name(),
                version = schema.version(),
                "schema version already registered, activating"
            );
            api.activate_schema(schema.name(), schema.version())
                .map_err(remote("activate version"))
        }
        Err(e) => Err(remote("register schema")(e)),
    }
}

fn schema_spec(schema: &LoadedSchema) -> Result<&str, ExecuteError> {
    std::str::from_utf8(&schema.data).map_err(|_| ExecuteError::InvalidSchemaEncoding {
        name: schema.name().to_string(),
        version: schema.version().to_string(),
    })
}

/// Apply `changes` in order.
///
/// The first failure stops the run; every later change is recorded as skipped. Inspect
/// [`ApplyRecord::failure`] for the change that failed.
pub fn apply_changes(
    cancel: &CancelToken,
    api: &dyn RepositoryApi,
    changes: &[Change],
    opts: &ApplyOptions,
) -> ApplyRecord {
    let mut record = ApplyRecord::new(opts.dry_run);
    let mut stopped = false;

    for (index, change) in changes.iter().enumerate() {
        let mut result = ApplyResult {
            index,
            domain: change.domain(),
            op: change.op(),
            headline: change.headline(),
            status: ApplyStatus::Skipped,
            message: None,
        };

        if opts.dry_run {
            result.message = Some("dry-run: not applied".to_string());
            record.summary.skipped += 1;
            record.results.push(result);
            continue;
        }

        if stopped {
            result.message = Some("skipped: an earlier change failed".to_string());
            record.summary.skipped += 1;
            record.results.push(result);
            continue;
        }

        record.summary.attempted += 1;
        match execute_change(cancel, api, change) {
            Ok(()) => {
                info!(
                    index,
                    domain = %result.domain,
                    change = %result.headline,
                    "applied change"
                );
                result.status = ApplyStatus::Applied;
                record.summary.applied += 1;
            }
            Err(e) => {
                warn!(
                    index,
                    domain = %result.domain,
                    change = %result.headline,
                    error = %e,
                    "change failed"
                );
                result.status = ApplyStatus::Failed;
                result.message = Some(e.to_string());
                record.summary.failed += 1;
                stopped = true;
            }
        }
        record.results.push(result);
    }

    record.ended_at = Some(Utc::now());
    record
}
