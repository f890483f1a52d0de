use super::{Delta, DiffContext, DiffError, Differ, remote, set_diff};
use crate::ports::RepositoryApi;
use repoconf_types::change::MetaTypeChange;
use repoconf_types::{Change, ChangeDomain};
use std::collections::{BTreeMap, BTreeSet};

/// Meta type registration and use.
///
/// A meta type is registered before anything uses it, and a main type's old use is dropped
/// before its new use is registered.
pub struct MetaTypeDiffer;

impl Differ for MetaTypeDiffer {
    fn domain(&self) -> ChangeDomain {
        ChangeDomain::MetaType
    }

    fn diff(
        &self,
        ctx: &DiffContext<'_>,
        api: &dyn RepositoryApi,
    ) -> Result<Vec<Change>, DiffError> {
        let meta_types = api
            .meta_types()
            .map_err(remote("get current meta types"))?;

        let defined: BTreeSet<&str> = meta_types.iter().map(|m| m.name.as_str()).collect();
        let mut current: BTreeMap<&str, &str> = BTreeMap::new();
        for meta in &meta_types {
            for main in &meta.used_by {
                current.insert(main.as_str(), meta.name.as_str());
            }
        }

        let wanted: BTreeMap<&str, &str> = ctx
            .config
            .documents
            .iter()
            .filter_map(|d| d.meta_type().map(|m| (d.doc_type.as_str(), m)))
            .collect();
        let used: BTreeSet<&str> = wanted.values().copied().collect();

        let mut changes = Vec::new();
        let mut requested = BTreeSet::new();

        for delta in set_diff(&wanted, &current, |w, c| w == c) {
            match delta {
                Delta::Added { key, wanted } => {
                    ensure_registered(wanted, &defined, &mut requested, &mut changes);
                    changes.push(register_use(key, wanted));
                }
                Delta::Changed {
                    key,
                    current,
                    wanted,
                } => {
                    ensure_registered(wanted, &defined, &mut requested, &mut changes);
                    changes.push(unregister_use(key, current));
                    changes.push(register_use(key, wanted));
                }
                Delta::Removed { key, current } => {
                    changes.push(unregister_use(key, current));
                }
            }
        }

        for meta in &defined {
            if !used.contains(meta) {
                changes.push(MetaTypeChange::Unregister {
                    meta_type: meta.to_string(),
                });
            }
        }

        Ok(changes.into_iter().map(Change::MetaType).collect())
    }
}

/// Register `meta` unless the repository or an earlier change already has it.
fn ensure_registered(
    meta: &str,
    defined: &BTreeSet<&str>,
    requested: &mut BTreeSet<String>,
    changes: &mut Vec<MetaTypeChange>,
) {
    if defined.contains(meta) || requested.contains(meta) {
        return;
    }
    requested.insert(meta.to_string());
    changes.push(MetaTypeChange::Register {
        meta_type: meta.to_string(),
    });
}

fn register_use(main_type: &str, meta_type: &str) -> MetaTypeChange {
    MetaTypeChange::RegisterUse {
        main_type: main_type.to_string(),
        meta_type: meta_type.to_string(),
    }
}

fn unregister_use(main_type: &str, meta_type: &str) -> MetaTypeChange {
    MetaTypeChange::UnregisterUse {
        main_type: main_type.to_string(),
        meta_type: meta_type.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRepository;
    use repoconf_types::config::DocumentConfig;
    use repoconf_types::{CancelToken, DesiredConfig};

    fn config(pairs: &[(&str, &str)]) -> DesiredConfig {
        DesiredConfig {
            documents: pairs
                .iter()
                .map(|(main, meta)| DocumentConfig {
                    doc_type: main.to_string(),
                    meta_doc: Some(meta.to_string()),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn diff(config: &DesiredConfig, repo: &MemoryRepository) -> Vec<MetaTypeChange> {
        let cancel = CancelToken::new();
        let ctx = DiffContext {
            cancel: &cancel,
            config,
            schemas: &[],
        };
        MetaTypeDiffer
            .diff(&ctx, repo)
            .expect("diff")
            .into_iter()
            .map(|c| match c {
                Change::MetaType(m) => m,
                other => panic!("unexpected change {other:?}"),
            })
            .collect()
    }

    #[test]
    fn switching_meta_type_drops_old_use_first() {
        let repo = MemoryRepository::new().with_meta_type("core/x-meta", &["core/article"]);
        let changes = diff(&config(&[("core/article", "core/y-meta")]), &repo);

        assert_eq!(
            changes,
            vec![
                MetaTypeChange::Register {
                    meta_type: "core/y-meta".to_string()
                },
                unregister_use("core/article", "core/x-meta"),
                register_use("core/article", "core/y-meta"),
                MetaTypeChange::Unregister {
                    meta_type: "core/x-meta".to_string()
                },
            ]
        );
    }

    #[test]
    fn shared_meta_type_is_registered_once() {
        let changes = diff(
            &config(&[("core/article", "core/meta"), ("core/planning", "core/meta")]),
            &MemoryRepository::new(),
        );

        assert_eq!(
            changes,
            vec![
                MetaTypeChange::Register {
                    meta_type: "core/meta".to_string()
                },
                register_use("core/article", "core/meta"),
                register_use("core/planning", "core/meta"),
            ]
        );
    }

    #[test]
    fn existing_meta_type_is_not_registered_again() {
        let repo = MemoryRepository::new().with_meta_type("core/meta", &[]);
        let changes = diff(&config(&[("core/article", "core/meta")]), &repo);
        assert_eq!(changes, vec![register_use("core/article", "core/meta")]);
    }

    #[test]
    fn empty_meta_doc_is_no_meta_type() {
        let changes = diff(&config(&[("core/article", "")]), &MemoryRepository::new());
        assert!(changes.is_empty());
    }
}
