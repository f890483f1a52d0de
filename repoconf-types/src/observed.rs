//! Observed state, fetched from the remote repository on every run and never cached.

use crate::config::MetricAggregation;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSchema {
    pub name: String,
    pub version: String,
}

/// A registered meta type and the main types that currently use it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTypeInfo {
    pub name: String,
    #[serde(default)]
    pub used_by: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricKindInfo {
    pub name: String,
    pub aggregation: MetricAggregation,
}
