use super::{Delta, DiffContext, DiffError, Differ, remote, set_diff, structural_diff};
use crate::ports::RepositoryApi;
use repoconf_types::change::WorkflowChange;
use repoconf_types::config::DocumentWorkflow;
use repoconf_types::{Change, ChangeDomain};
use std::collections::BTreeMap;

/// Workflows of the declared document types.
///
/// The repository cannot list every type that has a workflow, so the current state is read
/// per declared type. A type dropped from the configuration entirely is never a removal.
pub struct WorkflowDiffer;

impl Differ for WorkflowDiffer {
    fn domain(&self) -> ChangeDomain {
        ChangeDomain::Workflow
    }

    fn diff(
        &self,
        ctx: &DiffContext<'_>,
        api: &dyn RepositoryApi,
    ) -> Result<Vec<Change>, DiffError> {
        let mut wanted: BTreeMap<&str, &DocumentWorkflow> = BTreeMap::new();
        let mut current: BTreeMap<&str, DocumentWorkflow> = BTreeMap::new();

        for doc in &ctx.config.documents {
            ctx.cancel.check()?;

            if let Some(workflow) = &doc.workflow {
                wanted.insert(doc.doc_type.as_str(), workflow);
            }

            match api.workflow(&doc.doc_type) {
                Ok(workflow) => {
                    current.insert(doc.doc_type.as_str(), workflow);
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    return Err(remote(format!(
                        "get current workflow for {:?}",
                        doc.doc_type
                    ))(e));
                }
            }
        }

        let changes = set_diff(&wanted, &current, |w, c| *w == c)
            .into_iter()
            .map(|delta| match delta {
                Delta::Added { key, wanted } => WorkflowChange::Add {
                    doc_type: key.to_string(),
                    wanted: (*wanted).clone(),
                    diff: structural_diff(&DocumentWorkflow::default(), *wanted),
                },
                Delta::Changed {
                    key,
                    current,
                    wanted,
                } => WorkflowChange::Update {
                    doc_type: key.to_string(),
                    current: current.clone(),
                    wanted: (*wanted).clone(),
                    diff: structural_diff(current, *wanted),
                },
                Delta::Removed { key, current } => WorkflowChange::Remove {
                    doc_type: key.to_string(),
                    current: current.clone(),
                },
            })
            .map(Change::Workflow)
            .collect();

        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRepository;
    use repoconf_types::config::DocumentConfig;
    use repoconf_types::{CancelToken, DesiredConfig};

    fn workflow(steps: &[&str]) -> DocumentWorkflow {
        DocumentWorkflow {
            step_zero: "draft".to_string(),
            checkpoint: "usable".to_string(),
            negative_checkpoint: "unpublished".to_string(),
            steps: steps.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn doc(doc_type: &str, workflow: Option<DocumentWorkflow>) -> DocumentConfig {
        DocumentConfig {
            doc_type: doc_type.to_string(),
            workflow,
            ..Default::default()
        }
    }

    fn diff(config: &DesiredConfig, repo: &MemoryRepository) -> Vec<Change> {
        let cancel = CancelToken::new();
        let ctx = DiffContext {
            cancel: &cancel,
            config,
            schemas: &[],
        };
        WorkflowDiffer.diff(&ctx, repo).expect("diff")
    }

    #[test]
    fn not_found_means_no_current_workflow() {
        let config = DesiredConfig {
            documents: vec![doc("core/article", Some(workflow(&["done"])))],
            ..Default::default()
        };

        let changes = diff(&config, &MemoryRepository::new());
        assert_eq!(changes.len(), 1);
        let Change::Workflow(WorkflowChange::Add { doc_type, diff, .. }) = &changes[0] else {
            panic!("expected add, got {changes:?}");
        };
        assert_eq!(doc_type, "core/article");
        assert!(diff.contains("+    \"done\""));
    }

    #[test]
    fn step_order_is_significant() {
        let config = DesiredConfig {
            documents: vec![doc("core/article", Some(workflow(&["done", "approved"])))],
            ..Default::default()
        };
        let repo =
            MemoryRepository::new().with_workflow("core/article", workflow(&["approved", "done"]));

        let changes = diff(&config, &repo);
        assert!(matches!(
            changes.as_slice(),
            [Change::Workflow(WorkflowChange::Update { .. })]
        ));

        let same = MemoryRepository::new()
            .with_workflow("core/article", workflow(&["done", "approved"]));
        assert!(diff(&config, &same).is_empty());
    }

    #[test]
    fn removal_only_for_declared_types() {
        let config = DesiredConfig {
            documents: vec![doc("core/article", None)],
            ..Default::default()
        };
        let repo = MemoryRepository::new()
            .with_workflow("core/article", workflow(&["done"]))
            .with_workflow("core/planning", workflow(&["done"]));

        let changes = diff(&config, &repo);
        assert_eq!(
            changes,
            vec![Change::Workflow(WorkflowChange::Remove {
                doc_type: "core/article".to_string(),
                current: workflow(&["done"]),
            })]
        );
    }
}
