//! Rendering helpers for change lists and apply records.

use repoconf_types::Change;
use repoconf_types::apply::{ApplyRecord, ApplyStatus};

/// One line per change (`<op> <description>`), structural diffs included, followed by the
/// change's warnings.
pub fn render_changes_text(changes: &[Change]) -> String {
    if changes.is_empty() {
        return "No changes needed\n".to_string();
    }

    let mut out = String::new();
    for change in changes {
        let (op, desc) = change.describe();
        out.push_str(&format!("{op} {}\n", desc.trim_end()));
        for warning in change.warnings() {
            out.push_str(&format!("  Warning: {warning}\n"));
        }
    }
    out
}

pub fn render_plan_md(changes: &[Change]) -> String {
    let mut out = String::new();
    out.push_str("# repoconf plan\n\n");
    out.push_str(&format!("- Changes: {}\n", changes.len()));
    let warnings: usize = changes.iter().map(|c| c.warnings().len()).sum();
    out.push_str(&format!("- Warnings: {warnings}\n\n"));

    out.push_str("## Changes\n\n");
    if changes.is_empty() {
        out.push_str("_No changes needed._\n");
        return out;
    }

    for (i, change) in changes.iter().enumerate() {
        let (op, desc) = change.describe();
        out.push_str(&format!("### {}. `{}` {}\n\n", i + 1, op, change.headline()));
        out.push_str(&format!("- Domain: `{}`\n", change.domain()));
        for warning in change.warnings() {
            out.push_str(&format!("- **Warning:** {warning}\n"));
        }

        if let Some((_, diff)) = desc.split_once('\n')
            && !diff.trim().is_empty()
        {
            out.push_str("\n```diff\n");
            out.push_str(diff.trim_end());
            out.push_str("\n```\n");
        }
        out.push('\n');
    }

    out
}

/// What happened to each change of an apply run.
///
/// Applied changes are listed by headline. A failure names the change and the error, and is
/// followed by a reminder that the changes above it stay applied.
pub fn render_apply_text(record: &ApplyRecord) -> String {
    let mut out = String::new();

    for r in &record.results {
        match r.status {
            ApplyStatus::Applied => {
                out.push_str(&format!("{} {}\n", r.op, r.headline));
            }
            ApplyStatus::Failed => {
                out.push_str(&format!(
                    "failed: {} {}: {}\n",
                    r.op,
                    r.headline,
                    r.message.as_deref().unwrap_or("unknown error")
                ));
            }
            ApplyStatus::Skipped if record.dry_run => {
                out.push_str(&format!("{} {} (dry run)\n", r.op, r.headline));
            }
            ApplyStatus::Skipped => {}
        }
    }

    out.push('\n');
    let s = &record.summary;
    if record.dry_run {
        out.push_str(&format!("Dry run: {} change(s) not applied\n", s.skipped));
    } else if record.failure().is_some() {
        out.push_str(&format!(
            "Configuration partially updated: {} applied, {} failed, {} not attempted\n",
            s.applied, s.failed, s.skipped
        ));
    } else {
        out.push_str("Configuration has been updated\n");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use repoconf_types::apply::ApplyResult;
    use repoconf_types::change::{MetaTypeChange, SchemaChange, WorkflowChange};
    use repoconf_types::config::DocumentWorkflow;
    use repoconf_types::{ChangeDomain, ChangeOp, LoadedSchema, SchemaLock};

    fn downgrade() -> Change {
        Change::Schema(SchemaChange::Downgrade {
            current_version: "v1.2.0".to_string(),
            schema: LoadedSchema {
                lock: SchemaLock {
                    name: "core".to_string(),
                    url: String::new(),
                    version: "v1.1.0".to_string(),
                    hash: String::new(),
                },
                data: Vec::new(),
            },
        })
    }

    fn workflow_add() -> Change {
        Change::Workflow(WorkflowChange::Add {
            doc_type: "core/article".to_string(),
            wanted: DocumentWorkflow::default(),
            diff: "@@ -1 +1 @@\n-a\n+b\n".to_string(),
        })
    }

    #[test]
    fn text_lists_changes_with_warnings() {
        let changes = vec![
            downgrade(),
            Change::MetaType(MetaTypeChange::Register {
                meta_type: "core/meta".to_string(),
            }),
            workflow_add(),
        ];

        assert_eq!(
            render_changes_text(&changes),
            "~ schema downgrade core v1.2.0 => v1.1.0\n\
             \x20 Warning: downgrading schema\n\
             + meta type \"core/meta\"\n\
             + add workflow for \"core/article\":\n\
             @@ -1 +1 @@\n\
             -a\n\
             +b\n"
        );
    }

    #[test]
    fn empty_change_list() {
        assert_eq!(render_changes_text(&[]), "No changes needed\n");
        assert!(render_plan_md(&[]).contains("_No changes needed._"));
    }

    #[test]
    fn markdown_fences_structural_diffs() {
        let md = render_plan_md(&[downgrade(), workflow_add()]);
        assert!(md.contains("- Changes: 2\n- Warnings: 1\n"));
        assert!(md.contains("### 1. `~` schema downgrade core v1.2.0 => v1.1.0"));
        assert!(md.contains("- **Warning:** downgrading schema"));
        assert!(md.contains("```diff\n@@ -1 +1 @@\n-a\n+b\n```"));
    }

    fn result(index: usize, status: ApplyStatus, message: Option<&str>) -> ApplyResult {
        ApplyResult {
            index,
            domain: ChangeDomain::Status,
            op: ChangeOp::Add,
            headline: format!("status \"s{index}\" for \"core/article\""),
            status,
            message: message.map(str::to_string),
        }
    }

    #[test]
    fn apply_failure_names_the_change() {
        let mut record = ApplyRecord::new(false);
        record.results = vec![
            result(0, ApplyStatus::Applied, None),
            result(1, ApplyStatus::Failed, Some("update status: boom")),
            result(2, ApplyStatus::Skipped, Some("skipped")),
        ];
        record.summary.applied = 1;
        record.summary.failed = 1;
        record.summary.skipped = 1;

        assert_eq!(
            render_apply_text(&record),
            "+ status \"s0\" for \"core/article\"\n\
             failed: + status \"s1\" for \"core/article\": update status: boom\n\
             \n\
             Configuration partially updated: 1 applied, 1 failed, 1 not attempted\n"
        );
    }

    #[test]
    fn apply_success_summary() {
        let mut record = ApplyRecord::new(false);
        record.results = vec![result(0, ApplyStatus::Applied, None)];
        assert!(render_apply_text(&record).ends_with("\nConfiguration has been updated\n"));
    }

    #[test]
    fn dry_run_lists_every_change() {
        let mut record = ApplyRecord::new(true);
        record.results = vec![
            result(0, ApplyStatus::Skipped, Some("dry run")),
            result(1, ApplyStatus::Skipped, Some("dry run")),
        ];
        record.summary.skipped = 2;

        assert_eq!(
            render_apply_text(&record),
            "+ status \"s0\" for \"core/article\" (dry run)\n\
             + status \"s1\" for \"core/article\" (dry run)\n\
             \n\
             Dry run: 2 change(s) not applied\n"
        );
    }
}
