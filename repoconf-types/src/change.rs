//! The closed set of changes the diff engine can produce.
//!
//! Every change can describe itself (operation symbol + human text) and report non-fatal
//! warnings. Executing a change needs the remote repository and lives in `repoconf-apply`.

use crate::config::{DocumentWorkflow, MetricAggregation, TypeConfigSpec};
use crate::schema::LoadedSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation class of a change, rendered as `+`, `~` or `-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Add,
    Update,
    Remove,
}

impl ChangeOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ChangeOp::Add => "+",
            ChangeOp::Update => "~",
            ChangeOp::Remove => "-",
        }
    }
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Resource domain a change belongs to, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeDomain {
    Schema,
    MetaType,
    Status,
    Workflow,
    Metric,
    TypeConfig,
}

impl fmt::Display for ChangeDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeDomain::Schema => "schema",
            ChangeDomain::MetaType => "meta type",
            ChangeDomain::Status => "status",
            ChangeDomain::Workflow => "workflow",
            ChangeDomain::Metric => "metric",
            ChangeDomain::TypeConfig => "type configuration",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "domain", rename_all = "snake_case")]
pub enum Change {
    Schema(SchemaChange),
    MetaType(MetaTypeChange),
    Status(StatusChange),
    Workflow(WorkflowChange),
    Metric(MetricChange),
    TypeConfig(TypeConfigChange),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SchemaChange {
    Activate {
        schema: LoadedSchema,
    },
    Upgrade {
        current_version: String,
        schema: LoadedSchema,
    },
    Downgrade {
        current_version: String,
        schema: LoadedSchema,
    },
    Deactivate {
        name: String,
        current_version: String,
    },
}

impl SchemaChange {
    pub fn name(&self) -> &str {
        match self {
            SchemaChange::Activate { schema }
            | SchemaChange::Upgrade { schema, .. }
            | SchemaChange::Downgrade { schema, .. } => schema.name(),
            SchemaChange::Deactivate { name, .. } => name,
        }
    }

    /// The schema to register, for everything but deactivation.
    pub fn schema(&self) -> Option<&LoadedSchema> {
        match self {
            SchemaChange::Activate { schema }
            | SchemaChange::Upgrade { schema, .. }
            | SchemaChange::Downgrade { schema, .. } => Some(schema),
            SchemaChange::Deactivate { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MetaTypeChange {
    Register { meta_type: String },
    Unregister { meta_type: String },
    RegisterUse { main_type: String, meta_type: String },
    UnregisterUse { main_type: String, meta_type: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub doc_type: String,
    pub status: String,
    pub disable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WorkflowChange {
    Add {
        doc_type: String,
        wanted: DocumentWorkflow,
        diff: String,
    },
    Update {
        doc_type: String,
        current: DocumentWorkflow,
        wanted: DocumentWorkflow,
        diff: String,
    },
    Remove {
        doc_type: String,
        current: DocumentWorkflow,
    },
}

impl WorkflowChange {
    pub fn doc_type(&self) -> &str {
        match self {
            WorkflowChange::Add { doc_type, .. }
            | WorkflowChange::Update { doc_type, .. }
            | WorkflowChange::Remove { doc_type, .. } => doc_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MetricChange {
    Add {
        kind: String,
        aggregation: MetricAggregation,
    },
    Update {
        kind: String,
        from: MetricAggregation,
        to: MetricAggregation,
    },
    Remove {
        kind: String,
    },
}

/// Type configuration is always expressed as an update; the repository has no "unset" state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeConfigChange {
    pub doc_type: String,
    pub current: TypeConfigSpec,
    pub wanted: TypeConfigSpec,
    pub diff: String,
}

impl Change {
    pub fn domain(&self) -> ChangeDomain {
        match self {
            Change::Schema(_) => ChangeDomain::Schema,
            Change::MetaType(_) => ChangeDomain::MetaType,
            Change::Status(_) => ChangeDomain::Status,
            Change::Workflow(_) => ChangeDomain::Workflow,
            Change::Metric(_) => ChangeDomain::Metric,
            Change::TypeConfig(_) => ChangeDomain::TypeConfig,
        }
    }

    pub fn op(&self) -> ChangeOp {
        self.describe().0
    }

    /// Operation class and human-readable description. Multi-line for structural diffs.
    pub fn describe(&self) -> (ChangeOp, String) {
        match self {
            Change::Schema(sc) => match sc {
                SchemaChange::Deactivate {
                    name,
                    current_version,
                } => (
                    ChangeOp::Remove,
                    format!("deactivate schema {name}@{current_version}"),
                ),
                SchemaChange::Upgrade {
                    current_version,
                    schema,
                } => (
                    ChangeOp::Update,
                    format!(
                        "schema upgrade {} {} => {}",
                        schema.name(),
                        current_version,
                        schema.version()
                    ),
                ),
                SchemaChange::Downgrade {
                    current_version,
                    schema,
                } => (
                    ChangeOp::Update,
                    format!(
                        "schema downgrade {} {} => {}",
                        schema.name(),
                        current_version,
                        schema.version()
                    ),
                ),
                SchemaChange::Activate { schema } => (
                    ChangeOp::Add,
                    format!("activate schema {}@{}", schema.name(), schema.version()),
                ),
            },
            Change::MetaType(mc) => match mc {
                MetaTypeChange::Register { meta_type } => {
                    (ChangeOp::Add, format!("meta type {meta_type:?}"))
                }
                MetaTypeChange::RegisterUse {
                    main_type,
                    meta_type,
                } => (
                    ChangeOp::Add,
                    format!("meta type {meta_type:?} for {main_type:?}"),
                ),
                MetaTypeChange::Unregister { meta_type } => {
                    (ChangeOp::Remove, format!("meta type {meta_type:?}"))
                }
                MetaTypeChange::UnregisterUse {
                    main_type,
                    meta_type,
                } => (
                    ChangeOp::Remove,
                    format!("meta type {meta_type:?} for {main_type:?}"),
                ),
            },
            Change::Status(s) => {
                let op = if s.disable {
                    ChangeOp::Remove
                } else {
                    ChangeOp::Add
                };
                (op, format!("status {:?} for {:?}", s.status, s.doc_type))
            }
            Change::Workflow(wc) => match wc {
                WorkflowChange::Add { doc_type, diff, .. } => (
                    ChangeOp::Add,
                    format!("add workflow for {doc_type:?}:\n{diff}"),
                ),
                WorkflowChange::Update { doc_type, diff, .. } => (
                    ChangeOp::Update,
                    format!("update workflow for {doc_type:?}:\n{diff}"),
                ),
                WorkflowChange::Remove { doc_type, .. } => {
                    (ChangeOp::Remove, format!("remove workflow for {doc_type:?}"))
                }
            },
            Change::Metric(mc) => match mc {
                MetricChange::Add { kind, aggregation } => (
                    ChangeOp::Add,
                    format!("add metric kind {kind:?} (aggregation \"{aggregation}\")"),
                ),
                MetricChange::Update { kind, from, to } => (
                    ChangeOp::Update,
                    format!("update metric kind {kind:?} (aggregation \"{from}\" => \"{to}\")"),
                ),
                MetricChange::Remove { kind } => {
                    (ChangeOp::Remove, format!("remove metric kind {kind:?}"))
                }
            },
            Change::TypeConfig(tc) => (
                ChangeOp::Update,
                format!(
                    "update type configuration for {:?}:\n{}",
                    tc.doc_type, tc.diff
                ),
            ),
        }
    }

    /// First line of the description without a trailing colon.
    pub fn headline(&self) -> String {
        let (_, desc) = self.describe();
        let first = desc.lines().next().unwrap_or_default();
        first.trim_end_matches(':').to_string()
    }

    /// Non-fatal cautions shown next to the description.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        match self {
            Change::Schema(SchemaChange::Downgrade { .. }) => {
                warnings.push("downgrading schema".to_string());
            }
            Change::MetaType(MetaTypeChange::Unregister { .. }) => {
                warnings.push("the repository cannot unregister meta types yet".to_string());
            }
            Change::MetaType(MetaTypeChange::UnregisterUse { .. }) => {
                warnings.push("the repository cannot unregister meta type use yet".to_string());
            }
            _ => {}
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaLock;

    fn loaded(name: &str, version: &str) -> LoadedSchema {
        LoadedSchema {
            lock: SchemaLock {
                name: name.to_string(),
                url: String::new(),
                version: version.to_string(),
                hash: "00".to_string(),
            },
            data: b"{}".to_vec(),
        }
    }

    #[test]
    fn describes_schema_changes() {
        let add = Change::Schema(SchemaChange::Activate {
            schema: loaded("core", "1.0.0"),
        });
        assert_eq!(
            add.describe(),
            (ChangeOp::Add, "activate schema core@1.0.0".to_string())
        );

        let down = Change::Schema(SchemaChange::Downgrade {
            current_version: "1.2.0".to_string(),
            schema: loaded("core", "1.1.0"),
        });
        assert_eq!(
            down.describe(),
            (
                ChangeOp::Update,
                "schema downgrade core 1.2.0 => 1.1.0".to_string()
            )
        );
        assert_eq!(down.warnings(), vec!["downgrading schema".to_string()]);

        let up = Change::Schema(SchemaChange::Upgrade {
            current_version: "1.2.0".to_string(),
            schema: loaded("core", "1.3.0"),
        });
        assert!(up.warnings().is_empty());
    }

    #[test]
    fn headline_strips_structural_diff() {
        let change = Change::TypeConfig(TypeConfigChange {
            doc_type: "core/article".to_string(),
            current: TypeConfigSpec::default(),
            wanted: TypeConfigSpec {
                bounded_collection: true,
                ..Default::default()
            },
            diff: "-a\n+b\n".to_string(),
        });
        assert_eq!(
            change.headline(),
            "update type configuration for \"core/article\""
        );
        assert_eq!(change.op(), ChangeOp::Update);
    }

    #[test]
    fn status_disable_is_a_removal() {
        let change = Change::Status(StatusChange {
            doc_type: "core/article".to_string(),
            status: "usable".to_string(),
            disable: true,
        });
        assert_eq!(
            change.describe(),
            (
                ChangeOp::Remove,
                "status \"usable\" for \"core/article\"".to_string()
            )
        );
        assert_eq!(change.domain(), ChangeDomain::Status);
    }

    #[test]
    fn metric_update_shows_both_aggregations() {
        let change = Change::Metric(MetricChange::Update {
            kind: "charcount".to_string(),
            from: MetricAggregation::Replace,
            to: MetricAggregation::Increment,
        });
        assert_eq!(
            change.describe().1,
            "update metric kind \"charcount\" (aggregation \"replace\" => \"increment\")"
        );
    }

    #[test]
    fn serializes_with_domain_and_action_tags() {
        let change = Change::MetaType(MetaTypeChange::RegisterUse {
            main_type: "core/article".to_string(),
            meta_type: "core/article-meta".to_string(),
        });
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["domain"], "meta_type");
        assert_eq!(json["action"], "register_use");
        assert_eq!(json["main_type"], "core/article");
    }

    #[test]
    fn domains_sort_in_execution_order() {
        let mut domains = vec![
            ChangeDomain::TypeConfig,
            ChangeDomain::Status,
            ChangeDomain::Schema,
            ChangeDomain::Metric,
            ChangeDomain::Workflow,
            ChangeDomain::MetaType,
        ];
        domains.sort();
        assert_eq!(
            domains,
            vec![
                ChangeDomain::Schema,
                ChangeDomain::MetaType,
                ChangeDomain::Status,
                ChangeDomain::Workflow,
                ChangeDomain::Metric,
                ChangeDomain::TypeConfig,
            ]
        );
    }
}
