use super::{Delta, DiffContext, DiffError, Differ, remote, set_diff, structural_diff};
use crate::ports::RepositoryApi;
use repoconf_types::change::TypeConfigChange;
use repoconf_types::config::TypeConfigSpec;
use repoconf_types::{Change, ChangeDomain};
use std::collections::BTreeMap;

/// Per-type configuration, always expressed as an update.
///
/// Types the repository knows but the configuration doesn't are compared against the empty
/// configuration.
pub struct TypeConfigDiffer;

impl Differ for TypeConfigDiffer {
    fn domain(&self) -> ChangeDomain {
        ChangeDomain::TypeConfig
    }

    fn diff(
        &self,
        ctx: &DiffContext<'_>,
        api: &dyn RepositoryApi,
    ) -> Result<Vec<Change>, DiffError> {
        let types = api
            .document_types()
            .map_err(remote("get current document types"))?;

        let mut current: BTreeMap<&str, TypeConfigSpec> = BTreeMap::new();
        for doc_type in &types {
            ctx.cancel.check()?;

            let spec = match api.type_configuration(doc_type) {
                Ok(spec) => spec,
                Err(e) if e.is_not_found() => TypeConfigSpec::default(),
                Err(e) => return Err(remote("get current type configuration")(e)),
            };
            current.insert(doc_type.as_str(), spec);
        }

        let wanted: BTreeMap<&str, TypeConfigSpec> = ctx
            .config
            .documents
            .iter()
            .map(|d| (d.doc_type.as_str(), d.type_config()))
            .collect();

        let empty = TypeConfigSpec::default();
        let mut changes = Vec::new();
        for delta in set_diff(&wanted, &current, |w, c| w == c) {
            let (key, current, wanted) = match delta {
                Delta::Added { key, wanted } => (key, &empty, wanted),
                Delta::Removed { key, current } => (key, current, &empty),
                Delta::Changed {
                    key,
                    current,
                    wanted,
                } => (key, current, wanted),
            };
            if current == wanted {
                continue;
            }

            changes.push(Change::TypeConfig(TypeConfigChange {
                doc_type: key.to_string(),
                current: current.clone(),
                wanted: wanted.clone(),
                diff: structural_diff(current, wanted),
            }));
        }

        Ok(changes)
    }
}
