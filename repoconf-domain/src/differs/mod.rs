use crate::ports::{ApiError, RepositoryApi};
use repoconf_types::{CancelToken, Cancelled, Change, ChangeDomain, DesiredConfig, LoadedSchema};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

mod metatypes;
mod metrics;
mod schemas;
mod statuses;
mod typeconfig;
mod workflows;

pub use schemas::normalize_version;

/// Read-only inputs shared by every differ for one run.
#[derive(Debug, Clone, Copy)]
pub struct DiffContext<'a> {
    pub cancel: &'a CancelToken,
    pub config: &'a DesiredConfig,
    pub schemas: &'a [LoadedSchema],
}

pub trait Differ {
    fn domain(&self) -> ChangeDomain;

    fn diff(&self, ctx: &DiffContext<'_>, api: &dyn RepositoryApi)
    -> Result<Vec<Change>, DiffError>;
}

/// All differs, in execution order.
pub fn builtin_differs() -> Vec<Box<dyn Differ>> {
    vec![
        Box::new(schemas::SchemaDiffer),
        Box::new(metatypes::MetaTypeDiffer),
        Box::new(statuses::StatusDiffer),
        Box::new(workflows::WorkflowDiffer),
        Box::new(metrics::MetricDiffer),
        Box::new(typeconfig::TypeConfigDiffer),
    ]
}

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("{context}: {source}")]
    Remote {
        context: String,
        #[source]
        source: ApiError,
    },

    #[error("document type {0:?} has not been defined in schemas")]
    UndefinedDocumentType(String),

    #[error("meta document type {meta_type:?} used by {doc_type:?} has not been defined in schemas")]
    UndefinedMetaType { doc_type: String, meta_type: String },

    #[error("invalid schema {name}@{version}: {message}")]
    InvalidSchema {
        name: String,
        version: String,
        message: String,
    },

    #[error("compare {name} versions: invalid version {version:?}: {message}")]
    InvalidVersion {
        name: String,
        version: String,
        message: String,
    },

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Wrap a remote failure with what was being read. Cancellation stays cancellation.
pub(crate) fn remote(context: impl Into<String>) -> impl FnOnce(ApiError) -> DiffError {
    let context = context.into();
    move |source| match source {
        ApiError::Cancelled => DiffError::Cancelled(Cancelled),
        source => DiffError::Remote { context, source },
    }
}

/// One entry of a set difference between a wanted and a current map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta<'a, K, W, C> {
    Added { key: &'a K, wanted: &'a W },
    Removed { key: &'a K, current: &'a C },
    Changed {
        key: &'a K,
        current: &'a C,
        wanted: &'a W,
    },
}

impl<'a, K, W, C> Delta<'a, K, W, C> {
    pub fn key(&self) -> &'a K {
        match self {
            Delta::Added { key, .. } | Delta::Removed { key, .. } | Delta::Changed { key, .. } => {
                key
            }
        }
    }
}

/// Set difference of two maps in ascending key order.
///
/// Keys only in `wanted` are added, keys only in `current` are removed, and keys in both are
/// changed unless `eq` says the values match.
pub fn set_diff<'a, K, W, C>(
    wanted: &'a BTreeMap<K, W>,
    current: &'a BTreeMap<K, C>,
    eq: impl Fn(&W, &C) -> bool,
) -> Vec<Delta<'a, K, W, C>>
where
    K: Ord,
{
    let keys: BTreeSet<&'a K> = wanted.keys().chain(current.keys()).collect();

    keys.into_iter()
        .filter_map(|key| match (wanted.get(key), current.get(key)) {
            (Some(w), None) => Some(Delta::Added { key, wanted: w }),
            (None, Some(c)) => Some(Delta::Removed { key, current: c }),
            (Some(w), Some(c)) if !eq(w, c) => Some(Delta::Changed {
                key,
                current: c,
                wanted: w,
            }),
            _ => None,
        })
        .collect()
}

/// Line diff of two values rendered as pretty JSON, without file headers.
pub(crate) fn structural_diff<T: Serialize>(current: &T, wanted: &T) -> String {
    let before = pretty_json(current);
    let after = pretty_json(wanted);

    let patch = diffy::create_patch(&before, &after);
    let text = diffy::PatchFormatter::new().fmt_patch(&patch).to_string();

    text.lines()
        .skip_while(|l| l.starts_with("--- ") || l.starts_with("+++ "))
        .fold(String::new(), |mut out, line| {
            out.push_str(line);
            out.push('\n');
            out
        })
}

fn pretty_json<T: Serialize>(value: &T) -> String {
    let mut s = serde_json::to_string_pretty(value).unwrap_or_default();
    s.push('\n');
    s
}
