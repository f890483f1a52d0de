use super::{Delta, DiffContext, DiffError, Differ, remote, set_diff};
use crate::ports::RepositoryApi;
use repoconf_types::change::SchemaChange;
use repoconf_types::config::DocumentConfig;
use repoconf_types::{Change, ChangeDomain, LoadedSchema};
use semver::Version;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

pub struct SchemaDiffer;

impl Differ for SchemaDiffer {
    fn domain(&self) -> ChangeDomain {
        ChangeDomain::Schema
    }

    fn diff(
        &self,
        ctx: &DiffContext<'_>,
        api: &dyn RepositoryApi,
    ) -> Result<Vec<Change>, DiffError> {
        let active = api
            .list_active_schemas()
            .map_err(remote("get active schemas"))?;

        let wanted: BTreeMap<&str, &LoadedSchema> =
            ctx.schemas.iter().map(|s| (s.name(), s)).collect();
        let current: BTreeMap<&str, &str> = active
            .iter()
            .map(|s| (s.name.as_str(), s.version.as_str()))
            .collect();

        let mut changes = Vec::new();
        for delta in set_diff(&wanted, &current, |w, c| w.version() == *c) {
            let change = match delta {
                Delta::Added { wanted, .. } => SchemaChange::Activate {
                    schema: (*wanted).clone(),
                },
                Delta::Removed { key, current } => SchemaChange::Deactivate {
                    name: key.to_string(),
                    current_version: current.to_string(),
                },
                Delta::Changed {
                    key,
                    current,
                    wanted,
                } => {
                    let current_version = current.to_string();
                    let schema = (*wanted).clone();
                    match compare_versions(key, current, wanted.version())? {
                        Ordering::Greater => SchemaChange::Downgrade {
                            current_version,
                            schema,
                        },
                        _ => SchemaChange::Upgrade {
                            current_version,
                            schema,
                        },
                    }
                }
            };
            changes.push(Change::Schema(change));
        }

        check_docs_defined(ctx.schemas, &ctx.config.documents)?;

        Ok(changes)
    }
}

/// Parse a schema version leniently: `refs/tags/` and `v` prefixes are dropped and missing
/// minor/patch components are zero.
pub fn normalize_version(raw: &str) -> Result<Version, semver::Error> {
    let trimmed = raw.trim();
    let v = trimmed.strip_prefix("refs/tags/").unwrap_or(trimmed);
    let v = v.strip_prefix('v').unwrap_or(v);

    let core_end = v.find(['-', '+']).unwrap_or(v.len());
    let (core, rest) = v.split_at(core_end);
    let padded = match core.matches('.').count() {
        0 => format!("{core}.0.0{rest}"),
        1 => format!("{core}.0{rest}"),
        _ => v.to_string(),
    };

    Version::parse(&padded)
}

fn compare_versions(name: &str, current: &str, wanted: &str) -> Result<Ordering, DiffError> {
    let parse = |version: &str| {
        normalize_version(version).map_err(|e| DiffError::InvalidVersion {
            name: name.to_string(),
            version: version.to_string(),
            message: e.to_string(),
        })
    };
    Ok(parse(current)?.cmp_precedence(&parse(wanted)?))
}

#[derive(Debug, Default, Deserialize)]
struct ConstraintSet {
    #[serde(default)]
    documents: Vec<DeclaredDocument>,
}

#[derive(Debug, Default, Deserialize)]
struct DeclaredDocument {
    #[serde(default)]
    declares: String,
}

/// Every configured document type, and every meta type it uses, must be declared by a schema.
fn check_docs_defined(schemas: &[LoadedSchema], docs: &[DocumentConfig]) -> Result<(), DiffError> {
    let mut defined = BTreeSet::new();

    for schema in schemas {
        let set: ConstraintSet =
            serde_json::from_slice(&schema.data).map_err(|e| DiffError::InvalidSchema {
                name: schema.name().to_string(),
                version: schema.version().to_string(),
                message: e.to_string(),
            })?;

        defined.extend(
            set.documents
                .into_iter()
                .map(|d| d.declares)
                .filter(|d| !d.is_empty()),
        );
    }

    for doc in docs {
        if !defined.contains(&doc.doc_type) {
            return Err(DiffError::UndefinedDocumentType(doc.doc_type.clone()));
        }
        if let Some(meta) = doc.meta_type()
            && !defined.contains(meta)
        {
            return Err(DiffError::UndefinedMetaType {
                doc_type: doc.doc_type.clone(),
                meta_type: meta.to_string(),
            });
        }
    }

    Ok(())
}
