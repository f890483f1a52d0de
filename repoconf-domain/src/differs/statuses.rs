use super::{Delta, DiffContext, DiffError, Differ, remote, set_diff};
use crate::ports::RepositoryApi;
use repoconf_types::change::StatusChange;
use repoconf_types::{Change, ChangeDomain};
use std::collections::BTreeMap;

pub struct StatusDiffer;

impl Differ for StatusDiffer {
    fn domain(&self) -> ChangeDomain {
        ChangeDomain::Status
    }

    fn diff(
        &self,
        ctx: &DiffContext<'_>,
        api: &dyn RepositoryApi,
    ) -> Result<Vec<Change>, DiffError> {
        let mut docs: Vec<_> = ctx.config.documents.iter().collect();
        docs.sort_by(|a, b| a.doc_type.cmp(&b.doc_type));

        let mut changes = Vec::new();
        for doc in docs {
            ctx.cancel.check()?;

            let remote_statuses = match api.statuses(&doc.doc_type) {
                Ok(statuses) => statuses,
                Err(e) if e.is_not_found() => Vec::new(),
                Err(e) => {
                    return Err(remote(format!("get statuses for {:?}", doc.doc_type))(e));
                }
            };

            let wanted: BTreeMap<&str, ()> =
                doc.statuses.iter().map(|s| (s.as_str(), ())).collect();
            let current: BTreeMap<&str, ()> = remote_statuses
                .iter()
                .map(|s| (s.as_str(), ()))
                .collect();

            for delta in set_diff(&wanted, &current, |_, _| true) {
                let (status, disable) = match delta {
                    Delta::Added { key, .. } => (key, false),
                    Delta::Removed { key, .. } => (key, true),
                    Delta::Changed { .. } => continue,
                };
                changes.push(Change::Status(StatusChange {
                    doc_type: doc.doc_type.clone(),
                    status: status.to_string(),
                    disable,
                }));
            }
        }

        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRepository;
    use repoconf_types::config::DocumentConfig;
    use repoconf_types::{CancelToken, DesiredConfig};

    #[test]
    fn adds_and_disables_by_name() {
        let config = DesiredConfig {
            documents: vec![DocumentConfig {
                doc_type: "core/article".to_string(),
                statuses: vec!["usable".to_string(), "done".to_string()],
                ..Default::default()
            }],
            ..Default::default()
        };
        let repo =
            MemoryRepository::new().with_statuses("core/article", &["usable", "cancelled"]);
        let cancel = CancelToken::new();
        let ctx = DiffContext {
            cancel: &cancel,
            config: &config,
            schemas: &[],
        };

        let changes = StatusDiffer.diff(&ctx, &repo).expect("diff");
        assert_eq!(
            changes,
            vec![
                Change::Status(StatusChange {
                    doc_type: "core/article".to_string(),
                    status: "cancelled".to_string(),
                    disable: true,
                }),
                Change::Status(StatusChange {
                    doc_type: "core/article".to_string(),
                    status: "done".to_string(),
                    disable: false,
                }),
            ]
        );
    }

    #[test]
    fn stops_when_cancelled() {
        let config = DesiredConfig {
            documents: vec![DocumentConfig {
                doc_type: "core/article".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let cancel = CancelToken::new();
        cancel.cancel();
        let ctx = DiffContext {
            cancel: &cancel,
            config: &config,
            schemas: &[],
        };

        let err = StatusDiffer
            .diff(&ctx, &MemoryRepository::new())
            .unwrap_err();
        assert!(matches!(err, DiffError::Cancelled(_)));
    }
}
