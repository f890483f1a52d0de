//! In-memory `RepositoryApi` for tests and dry experiments.

use crate::ports::{ApiError, RepositoryApi};
use repoconf_types::config::{DocumentWorkflow, MetricAggregation, TypeConfigSpec};
use repoconf_types::observed::{ActiveSchema, MetaTypeInfo, MetricKindInfo};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A mutating call made against a [`MemoryRepository`], in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    RegisterSchema {
        name: String,
        version: String,
        activate: bool,
    },
    ActivateSchema {
        name: String,
        version: String,
    },
    DeactivateSchema {
        name: String,
    },
    RegisterMetaType {
        meta_type: String,
    },
    RegisterMetaTypeUse {
        main_type: String,
        meta_type: String,
    },
    UpdateStatus {
        doc_type: String,
        status: String,
        disabled: bool,
    },
    SetWorkflow {
        doc_type: String,
    },
    DeleteWorkflow {
        doc_type: String,
    },
    RegisterMetricKind {
        kind: String,
        aggregation: MetricAggregation,
    },
    DeleteMetricKind {
        kind: String,
    },
    ConfigureType {
        doc_type: String,
    },
}

impl RecordedCall {
    /// The `RepositoryApi` method that produced this call.
    pub fn method(&self) -> &'static str {
        match self {
            RecordedCall::RegisterSchema { .. } => "register_schema",
            RecordedCall::ActivateSchema { .. } => "activate_schema",
            RecordedCall::DeactivateSchema { .. } => "deactivate_schema",
            RecordedCall::RegisterMetaType { .. } => "register_meta_type",
            RecordedCall::RegisterMetaTypeUse { .. } => "register_meta_type_use",
            RecordedCall::UpdateStatus { .. } => "update_status",
            RecordedCall::SetWorkflow { .. } => "set_workflow",
            RecordedCall::DeleteWorkflow { .. } => "delete_workflow",
            RecordedCall::RegisterMetricKind { .. } => "register_metric_kind",
            RecordedCall::DeleteMetricKind { .. } => "delete_metric_kind",
            RecordedCall::ConfigureType { .. } => "configure_type",
        }
    }
}

#[derive(Debug, Default)]
struct State {
    /// name -> version -> spec
    registered: BTreeMap<String, BTreeMap<String, String>>,
    active: BTreeMap<String, String>,
    extra_types: BTreeSet<String>,
    /// meta type -> main types using it
    meta_types: BTreeMap<String, BTreeSet<String>>,
    /// doc type -> status -> disabled
    statuses: BTreeMap<String, BTreeMap<String, bool>>,
    workflows: BTreeMap<String, DocumentWorkflow>,
    metrics: BTreeMap<String, MetricAggregation>,
    type_configs: BTreeMap<String, TypeConfigSpec>,
    failures: BTreeMap<String, ApiError>,
    calls: Vec<RecordedCall>,
}

impl State {
    fn fail_if_injected(&self, method: &str) -> Result<(), ApiError> {
        match self.failures.get(method) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn record(&mut self, call: RecordedCall) -> Result<(), ApiError> {
        let method = call.method();
        self.calls.push(call);
        self.fail_if_injected(method)
    }
}

/// A repository held entirely in memory.
///
/// Mutating calls are recorded (including failed ones) and can be made to fail by method
/// name with [`MemoryRepository::fail_on`]. Registering a schema version that already
/// exists fails with `FailedPrecondition`, like the real service.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<State>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&mut self) -> &mut State {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register and activate a schema version.
    pub fn with_active_schema(mut self, name: &str, version: &str, spec: &str) -> Self {
        let state = self.state_mut();
        state
            .registered
            .entry(name.to_string())
            .or_default()
            .insert(version.to_string(), spec.to_string());
        state.active.insert(name.to_string(), version.to_string());
        self
    }

    /// Document types known regardless of the active schemas.
    pub fn with_document_types(mut self, types: &[&str]) -> Self {
        self.state_mut()
            .extra_types
            .extend(types.iter().map(|t| t.to_string()));
        self
    }

    pub fn with_meta_type(mut self, meta_type: &str, used_by: &[&str]) -> Self {
        self.state_mut().meta_types.insert(
            meta_type.to_string(),
            used_by.iter().map(|m| m.to_string()).collect(),
        );
        self
    }

    pub fn with_statuses(mut self, doc_type: &str, statuses: &[&str]) -> Self {
        self.state_mut().statuses.insert(
            doc_type.to_string(),
            statuses.iter().map(|s| (s.to_string(), false)).collect(),
        );
        self
    }

    pub fn with_workflow(mut self, doc_type: &str, workflow: DocumentWorkflow) -> Self {
        self.state_mut()
            .workflows
            .insert(doc_type.to_string(), workflow);
        self
    }

    pub fn with_metric_kind(mut self, kind: &str, aggregation: MetricAggregation) -> Self {
        self.state_mut()
            .metrics
            .insert(kind.to_string(), aggregation);
        self
    }

    pub fn with_type_config(mut self, doc_type: &str, config: TypeConfigSpec) -> Self {
        self.state_mut()
            .type_configs
            .insert(doc_type.to_string(), config);
        self
    }

    /// Make every later call to `method` (e.g. `"set_workflow"`) fail with `err`.
    pub fn fail_on(&self, method: &str, err: ApiError) {
        self.state().failures.insert(method.to_string(), err);
    }

    /// Mutating calls made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }
}

#[derive(Debug, Default, Deserialize)]
struct DeclaredTypes {
    #[serde(default)]
    documents: Vec<Declared>,
}

#[derive(Debug, Default, Deserialize)]
struct Declared {
    #[serde(default)]
    declares: String,
}

fn declared_types(spec: &str) -> Vec<String> {
    serde_json::from_str::<DeclaredTypes>(spec)
        .map(|d| {
            d.documents
                .into_iter()
                .map(|d| d.declares)
                .filter(|d| !d.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

impl RepositoryApi for MemoryRepository {
    fn list_active_schemas(&self) -> Result<Vec<ActiveSchema>, ApiError> {
        let state = self.state();
        state.fail_if_injected("list_active_schemas")?;
        Ok(state
            .active
            .iter()
            .map(|(name, version)| ActiveSchema {
                name: name.clone(),
                version: version.clone(),
            })
            .collect())
    }

    fn register_schema(
        &self,
        name: &str,
        version: &str,
        spec: &str,
        activate: bool,
    ) -> Result<(), ApiError> {
        let mut state = self.state();
        state.record(RecordedCall::RegisterSchema {
            name: name.to_string(),
            version: version.to_string(),
            activate,
        })?;

        let versions = state.registered.entry(name.to_string()).or_default();
        if versions.contains_key(version) {
            return Err(ApiError::FailedPrecondition(format!(
                "schema {name}@{version} is already registered"
            )));
        }
        versions.insert(version.to_string(), spec.to_string());

        if activate {
            state.active.insert(name.to_string(), version.to_string());
        }
        Ok(())
    }

    fn activate_schema(&self, name: &str, version: &str) -> Result<(), ApiError> {
        let mut state = self.state();
        state.record(RecordedCall::ActivateSchema {
            name: name.to_string(),
            version: version.to_string(),
        })?;

        let known = state
            .registered
            .get(name)
            .is_some_and(|v| v.contains_key(version));
        if !known {
            return Err(ApiError::NotFound(format!("schema {name}@{version}")));
        }
        state.active.insert(name.to_string(), version.to_string());
        Ok(())
    }

    fn deactivate_schema(&self, name: &str) -> Result<(), ApiError> {
        let mut state = self.state();
        state.record(RecordedCall::DeactivateSchema {
            name: name.to_string(),
        })?;

        state.active.remove(name);
        Ok(())
    }

    fn document_types(&self) -> Result<Vec<String>, ApiError> {
        let state = self.state();
        state.fail_if_injected("document_types")?;

        let mut types = state.extra_types.clone();
        for (name, version) in &state.active {
            if let Some(spec) = state.registered.get(name).and_then(|v| v.get(version)) {
                types.extend(declared_types(spec));
            }
        }
        Ok(types.into_iter().collect())
    }

    fn meta_types(&self) -> Result<Vec<MetaTypeInfo>, ApiError> {
        let state = self.state();
        state.fail_if_injected("meta_types")?;
        Ok(state
            .meta_types
            .iter()
            .map(|(name, used_by)| MetaTypeInfo {
                name: name.clone(),
                used_by: used_by.iter().cloned().collect(),
            })
            .collect())
    }

    fn register_meta_type(&self, meta_type: &str) -> Result<(), ApiError> {
        let mut state = self.state();
        state.record(RecordedCall::RegisterMetaType {
            meta_type: meta_type.to_string(),
        })?;

        state.meta_types.entry(meta_type.to_string()).or_default();
        Ok(())
    }

    fn register_meta_type_use(&self, main_type: &str, meta_type: &str) -> Result<(), ApiError> {
        let mut state = self.state();
        state.record(RecordedCall::RegisterMetaTypeUse {
            main_type: main_type.to_string(),
            meta_type: meta_type.to_string(),
        })?;

        if !state.meta_types.contains_key(meta_type) {
            return Err(ApiError::NotFound(format!("meta type {meta_type:?}")));
        }
        for used_by in state.meta_types.values_mut() {
            used_by.remove(main_type);
        }
        if let Some(used_by) = state.meta_types.get_mut(meta_type) {
            used_by.insert(main_type.to_string());
        }
        Ok(())
    }

    fn statuses(&self, doc_type: &str) -> Result<Vec<String>, ApiError> {
        let state = self.state();
        state.fail_if_injected("statuses")?;
        Ok(state
            .statuses
            .get(doc_type)
            .map(|s| {
                s.iter()
                    .filter(|(_, disabled)| !**disabled)
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn update_status(
        &self,
        doc_type: &str,
        status: &str,
        disabled: bool,
    ) -> Result<(), ApiError> {
        let mut state = self.state();
        state.record(RecordedCall::UpdateStatus {
            doc_type: doc_type.to_string(),
            status: status.to_string(),
            disabled,
        })?;

        state
            .statuses
            .entry(doc_type.to_string())
            .or_default()
            .insert(status.to_string(), disabled);
        Ok(())
    }

    fn workflow(&self, doc_type: &str) -> Result<DocumentWorkflow, ApiError> {
        let state = self.state();
        state.fail_if_injected("workflow")?;
        state
            .workflows
            .get(doc_type)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("no workflow for {doc_type:?}")))
    }

    fn set_workflow(&self, doc_type: &str, workflow: &DocumentWorkflow) -> Result<(), ApiError> {
        let mut state = self.state();
        state.record(RecordedCall::SetWorkflow {
            doc_type: doc_type.to_string(),
        })?;

        state
            .workflows
            .insert(doc_type.to_string(), workflow.clone());
        Ok(())
    }

    fn delete_workflow(&self, doc_type: &str) -> Result<(), ApiError> {
        let mut state = self.state();
        state.record(RecordedCall::DeleteWorkflow {
            doc_type: doc_type.to_string(),
        })?;

        state.workflows.remove(doc_type);
        Ok(())
    }

    fn metric_kinds(&self) -> Result<Vec<MetricKindInfo>, ApiError> {
        let state = self.state();
        state.fail_if_injected("metric_kinds")?;
        Ok(state
            .metrics
            .iter()
            .map(|(name, aggregation)| MetricKindInfo {
                name: name.clone(),
                aggregation: *aggregation,
            })
            .collect())
    }

    fn register_metric_kind(
        &self,
        kind: &str,
        aggregation: MetricAggregation,
    ) -> Result<(), ApiError> {
        let mut state = self.state();
        state.record(RecordedCall::RegisterMetricKind {
            kind: kind.to_string(),
            aggregation,
        })?;

        state.metrics.insert(kind.to_string(), aggregation);
        Ok(())
    }

    fn delete_metric_kind(&self, kind: &str) -> Result<(), ApiError> {
        let mut state = self.state();
        state.record(RecordedCall::DeleteMetricKind {
            kind: kind.to_string(),
        })?;

        state.metrics.remove(kind);
        Ok(())
    }

    fn type_configuration(&self, doc_type: &str) -> Result<TypeConfigSpec, ApiError> {
        let state = self.state();
        state.fail_if_injected("type_configuration")?;
        state
            .type_configs
            .get(doc_type)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("no configuration for {doc_type:?}")))
    }

    fn configure_type(&self, doc_type: &str, config: &TypeConfigSpec) -> Result<(), ApiError> {
        let mut state = self.state();
        state.record(RecordedCall::ConfigureType {
            doc_type: doc_type.to_string(),
        })?;

        state
            .type_configs
            .insert(doc_type.to_string(), config.clone());
        Ok(())
    }
}
