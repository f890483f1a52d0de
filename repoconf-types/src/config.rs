//! Declared configuration: the state an operator wants the repository to be in.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// The declared state for a run. Several files may be merged into one `DesiredConfig`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesiredConfig {
    #[serde(rename = "document")]
    pub documents: Vec<DocumentConfig>,

    #[serde(rename = "schema_set")]
    pub schema_sets: Vec<SchemaSet>,

    #[serde(rename = "metric")]
    pub metrics: Vec<MetricKindSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentConfig {
    #[serde(rename = "type")]
    pub doc_type: String,

    /// Meta document type used by this main type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_doc: Option<String>,

    #[serde(default)]
    pub statuses: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<DocumentWorkflow>,

    #[serde(default)]
    pub bounded_collection: bool,

    #[serde(default, rename = "time_expression")]
    pub time_expressions: Vec<TimeExpression>,

    #[serde(default, rename = "label_expression")]
    pub label_expressions: Vec<LabelExpression>,
}

impl DocumentConfig {
    /// The structured type configuration this document declares.
    pub fn type_config(&self) -> TypeConfigSpec {
        TypeConfigSpec {
            bounded_collection: self.bounded_collection,
            time_expressions: self.time_expressions.clone(),
            label_expressions: self.label_expressions.clone(),
        }
    }

    /// The declared meta type, treating an empty string as absent.
    pub fn meta_type(&self) -> Option<&str> {
        self.meta_doc.as_deref().filter(|m| !m.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentWorkflow {
    #[serde(default)]
    pub step_zero: String,
    #[serde(default)]
    pub checkpoint: String,
    #[serde(default)]
    pub negative_checkpoint: String,
    #[serde(default)]
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeExpression {
    pub expression: String,
    #[serde(default)]
    pub layout: String,
    #[serde(default)]
    pub timezone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelExpression {
    pub expression: String,
    pub template: String,
}

/// Per-type structured configuration, compared as a whole.
///
/// Both expression lists are ordered; reordering them is a change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeConfigSpec {
    pub bounded_collection: bool,
    #[serde(default)]
    pub time_expressions: Vec<TimeExpression>,
    #[serde(default)]
    pub label_expressions: Vec<LabelExpression>,
}

/// A named group of schemas loaded from one source at one version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSet {
    pub name: String,
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_template: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    #[serde(default)]
    pub schemas: Vec<String>,
}

/// Where the schemas of a set come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaLocator<'a> {
    Http { url_template: &'a str },
    Git { repository: &'a str },
}

impl SchemaSet {
    pub fn locator(&self) -> Result<SchemaLocator<'_>, ConfigError> {
        let template = self.url_template.as_deref().filter(|t| !t.is_empty());
        let repository = self.repository.as_deref().filter(|r| !r.is_empty());

        match (template, repository) {
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousSchemaSource {
                set: self.name.clone(),
            }),
            (Some(t), None) if t.starts_with("https://") || t.starts_with("http://") => {
                Ok(SchemaLocator::Http { url_template: t })
            }
            (None, Some(r)) => Ok(SchemaLocator::Git { repository: r }),
            _ => Err(ConfigError::UnknownSchemaSource {
                set: self.name.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricAggregation {
    Replace,
    Increment,
}

impl fmt::Display for MetricAggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricAggregation::Replace => f.write_str("replace"),
            MetricAggregation::Increment => f.write_str("increment"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricKindSpec {
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<MetricAggregation>,
}

impl MetricKindSpec {
    /// Unspecified aggregation means replace.
    pub fn effective_aggregation(&self) -> MetricAggregation {
        self.aggregation.unwrap_or(MetricAggregation::Replace)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("document type {doc_type:?} is declared more than once")]
    DuplicateDocumentType { doc_type: String },

    #[error("metric kind {kind:?} is declared more than once")]
    DuplicateMetricKind { kind: String },

    #[error("schema {name:?} is declared by both schema set {first:?} and {second:?}")]
    DuplicateSchema {
        name: String,
        first: String,
        second: String,
    },

    #[error("schema set {set:?} has no known schema source, set url_template or repository")]
    UnknownSchemaSource { set: String },

    #[error("schema set {set:?} sets both url_template and repository")]
    AmbiguousSchemaSource { set: String },
}

impl DesiredConfig {
    /// Append the contents of another config (used when merging several files).
    pub fn merge(&mut self, other: DesiredConfig) {
        self.documents.extend(other.documents);
        self.schema_sets.extend(other.schema_sets);
        self.metrics.extend(other.metrics);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut doc_types = BTreeSet::new();
        for doc in &self.documents {
            if !doc_types.insert(doc.doc_type.as_str()) {
                return Err(ConfigError::DuplicateDocumentType {
                    doc_type: doc.doc_type.clone(),
                });
            }
        }

        let mut kinds = BTreeSet::new();
        for metric in &self.metrics {
            if !kinds.insert(metric.kind.as_str()) {
                return Err(ConfigError::DuplicateMetricKind {
                    kind: metric.kind.clone(),
                });
            }
        }

        let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
        for set in &self.schema_sets {
            set.locator()?;
            for name in &set.schemas {
                if let Some(first) = owners.insert(name.as_str(), set.name.as_str()) {
                    return Err(ConfigError::DuplicateSchema {
                        name: name.clone(),
                        first: first.to_string(),
                        second: set.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn document(&self, doc_type: &str) -> Option<&DocumentConfig> {
        self.documents.iter().find(|d| d.doc_type == doc_type)
    }
}
