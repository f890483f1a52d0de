use repoconf_types::Cancelled;
use repoconf_types::config::{DocumentWorkflow, MetricAggregation, TypeConfigSpec};
use repoconf_types::observed::{ActiveSchema, MetaTypeInfo, MetricKindInfo};
use thiserror::Error;

/// Errors from the remote repository.
///
/// `NotFound` and `FailedPrecondition` are kept apart from other failures: the first is a
/// legitimate "nothing there" for several reads, the second means a schema version is
/// already registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote error ({code}): {message}")]
    Remote { code: String, message: String },
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    pub fn is_failed_precondition(&self) -> bool {
        matches!(self, ApiError::FailedPrecondition(_))
    }
}

impl From<Cancelled> for ApiError {
    fn from(_: Cancelled) -> Self {
        ApiError::Cancelled
    }
}

/// The capabilities of the remote document repository that reconciliation needs.
///
/// Every call is a synchronous request/response and its own remote transaction.
pub trait RepositoryApi {
    // Schemas.
    fn list_active_schemas(&self) -> Result<Vec<ActiveSchema>, ApiError>;
    fn register_schema(
        &self,
        name: &str,
        version: &str,
        spec: &str,
        activate: bool,
    ) -> Result<(), ApiError>;
    fn activate_schema(&self, name: &str, version: &str) -> Result<(), ApiError>;
    fn deactivate_schema(&self, name: &str) -> Result<(), ApiError>;
    fn document_types(&self) -> Result<Vec<String>, ApiError>;

    // Meta types.
    fn meta_types(&self) -> Result<Vec<MetaTypeInfo>, ApiError>;
    fn register_meta_type(&self, meta_type: &str) -> Result<(), ApiError>;
    fn register_meta_type_use(&self, main_type: &str, meta_type: &str) -> Result<(), ApiError>;

    // Statuses.
    fn statuses(&self, doc_type: &str) -> Result<Vec<String>, ApiError>;
    fn update_status(&self, doc_type: &str, status: &str, disabled: bool)
    -> Result<(), ApiError>;

    // Workflows. A type without a workflow is `NotFound`.
    fn workflow(&self, doc_type: &str) -> Result<DocumentWorkflow, ApiError>;
    fn set_workflow(&self, doc_type: &str, workflow: &DocumentWorkflow) -> Result<(), ApiError>;
    fn delete_workflow(&self, doc_type: &str) -> Result<(), ApiError>;

    // Metrics.
    fn metric_kinds(&self) -> Result<Vec<MetricKindInfo>, ApiError>;
    fn register_metric_kind(
        &self,
        kind: &str,
        aggregation: MetricAggregation,
    ) -> Result<(), ApiError>;
    fn delete_metric_kind(&self, kind: &str) -> Result<(), ApiError>;

    // Type configuration. An unconfigured type may be `NotFound`.
    fn type_configuration(&self, doc_type: &str) -> Result<TypeConfigSpec, ApiError>;
    fn configure_type(&self, doc_type: &str, config: &TypeConfigSpec) -> Result<(), ApiError>;
}
