use pretty_assertions::assert_eq;
use repoconf_apply::{ApplyOptions, apply_changes, execute_change};
use repoconf_domain::{ApiError, MemoryRepository, RecordedCall, RepositoryApi};
use repoconf_types::apply::ApplyStatus;
use repoconf_types::change::{MetaTypeChange, SchemaChange, StatusChange, WorkflowChange};
use repoconf_types::config::DocumentWorkflow;
use repoconf_types::{CancelToken, Change, LoadedSchema, SchemaLock};

fn schema(name: &str, version: &str) -> LoadedSchema {
    LoadedSchema {
        lock: SchemaLock {
            name: name.to_string(),
            url: String::new(),
            version: version.to_string(),
            hash: String::new(),
        },
        data: br#"{"documents":[{"declares":"core/article"}]}"#.to_vec(),
    }
}

fn status(status: &str) -> Change {
    Change::Status(StatusChange {
        doc_type: "core/article".to_string(),
        status: status.to_string(),
        disable: false,
    })
}

#[test]
fn existing_schema_version_falls_through_to_activation() {
    let repo = MemoryRepository::new()
        .with_active_schema("core", "v1.0.0", "{}")
        .with_active_schema("core", "v1.1.0", "{}");
    let change = Change::Schema(SchemaChange::Downgrade {
        current_version: "v1.1.0".to_string(),
        schema: schema("core", "v1.0.0"),
    });

    execute_change(&CancelToken::new(), &repo, &change).expect("execute");
    assert_eq!(
        repo.calls(),
        vec![
            RecordedCall::RegisterSchema {
                name: "core".to_string(),
                version: "v1.0.0".to_string(),
                activate: true,
            },
            RecordedCall::ActivateSchema {
                name: "core".to_string(),
                version: "v1.0.0".to_string(),
            },
        ]
    );
    assert_eq!(repo.list_active_schemas().expect("list")[0].version, "v1.0.0");

    // Running the same change again is still a success.
    execute_change(&CancelToken::new(), &repo, &change).expect("execute again");
}

#[test]
fn unregistering_meta_types_is_reported_not_skipped() {
    let repo = MemoryRepository::new();
    let changes = vec![
        status("usable"),
        Change::MetaType(MetaTypeChange::UnregisterUse {
            main_type: "core/article".to_string(),
            meta_type: "core/article-meta".to_string(),
        }),
        status("done"),
    ];

    let record = apply_changes(
        &CancelToken::new(),
        &repo,
        &changes,
        &ApplyOptions::default(),
    );

    let statuses: Vec<ApplyStatus> = record.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            ApplyStatus::Applied,
            ApplyStatus::Failed,
            ApplyStatus::Skipped
        ]
    );

    let failure = record.failure().expect("failure");
    assert_eq!(failure.index, 1);
    assert_eq!(
        failure.message.as_deref(),
        Some("not possible yet to unregister meta type use")
    );
    assert_eq!(record.applied().count(), 1);
    assert_eq!(record.summary.attempted, 2);
    assert_eq!(record.summary.skipped, 1);
    assert_eq!(repo.calls().len(), 1);
}

#[test]
fn remote_failure_stops_without_rollback() {
    let repo = MemoryRepository::new();
    repo.fail_on("set_workflow", ApiError::Transport("connection reset".to_string()));
    let changes = vec![
        status("usable"),
        Change::Workflow(WorkflowChange::Add {
            doc_type: "core/article".to_string(),
            wanted: DocumentWorkflow::default(),
            diff: String::new(),
        }),
        status("done"),
    ];

    let record = apply_changes(
        &CancelToken::new(),
        &repo,
        &changes,
        &ApplyOptions::default(),
    );

    let failure = record.failure().expect("failure");
    assert_eq!(failure.headline, "add workflow for \"core/article\"");
    assert_eq!(
        failure.message.as_deref(),
        Some("set workflow: transport error: connection reset")
    );
    assert_eq!(
        repo.statuses("core/article").expect("statuses"),
        vec!["usable".to_string()]
    );
    assert!(record.ended_at.is_some());
}

#[test]
fn dry_run_never_calls_the_repository() {
    let repo = MemoryRepository::new();
    let changes = vec![status("usable"), status("done")];

    let record = apply_changes(
        &CancelToken::new(),
        &repo,
        &changes,
        &ApplyOptions { dry_run: true },
    );

    assert!(record.dry_run);
    assert!(
        record
            .results
            .iter()
            .all(|r| r.status == ApplyStatus::Skipped)
    );
    assert_eq!(record.summary.skipped, 2);
    assert_eq!(record.summary.attempted, 0);
    assert!(repo.calls().is_empty());
}

#[test]
fn cancellation_between_changes_leaves_earlier_changes_applied() {
    let repo = MemoryRepository::new();
    let cancel = CancelToken::new();

    execute_change(&cancel, &repo, &status("usable")).expect("first");
    cancel.cancel();
    let record = apply_changes(&cancel, &repo, &[status("done")], &ApplyOptions::default());

    let failure = record.failure().expect("failure");
    assert_eq!(failure.message.as_deref(), Some("operation cancelled"));
    assert_eq!(repo.calls().len(), 1);
}
