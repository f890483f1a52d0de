//! `RepositoryApi` over the repository's Twirp JSON protocol.
//!
//! Every call is `POST {endpoint}/twirp/elephant.repository.{Service}/{Method}` with a JSON
//! body. Protobuf JSON omits zero values, so every response field is optional on the wire.

use crate::settings::RemoteSettings;
use repoconf_domain::{ApiError, RepositoryApi};
use repoconf_types::CancelToken;
use repoconf_types::config::{
    DocumentWorkflow, LabelExpression, MetricAggregation, TimeExpression, TypeConfigSpec,
};
use repoconf_types::observed::{ActiveSchema, MetaTypeInfo, MetricKindInfo};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use url::Url;

const SCHEMAS: &str = "Schemas";
const WORKFLOWS: &str = "Workflows";
const METRICS: &str = "Metrics";

#[derive(Debug, Clone)]
pub struct TwirpRepository {
    client: Client,
    base: Url,
    token: Option<String>,
    cancel: CancelToken,
}

impl TwirpRepository {
    /// Client for `endpoint`. Calls stop waiting on the server as soon as `cancel` fires.
    pub fn new(
        endpoint: &str,
        token: Option<String>,
        cancel: CancelToken,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| ApiError::Transport(format!("build client: {e}")))?;
        Self::with_client(client, endpoint, token, cancel)
    }

    pub fn from_settings(
        settings: &RemoteSettings,
        cancel: CancelToken,
    ) -> Result<Self, ApiError> {
        Self::new(&settings.endpoint, settings.token.clone(), cancel)
    }

    pub fn with_client(
        client: Client,
        endpoint: &str,
        token: Option<String>,
        cancel: CancelToken,
    ) -> Result<Self, ApiError> {
        let base = Url::parse(endpoint)
            .map_err(|e| ApiError::Transport(format!("invalid endpoint {endpoint:?}: {e}")))?;
        match base.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(ApiError::Transport(format!(
                    "invalid endpoint {endpoint:?}: unsupported scheme {scheme:?}"
                )));
            }
        }

        Ok(Self {
            client,
            base,
            token: token.filter(|t| !t.is_empty()),
            cancel,
        })
    }

    fn method_url(&self, service: &str, method: &str) -> Url {
        let path = format!(
            "{}/twirp/elephant.repository.{service}/{method}",
            self.base.path().trim_end_matches('/')
        );
        let mut url = self.base.clone();
        url.set_path(&path);
        url
    }

    fn call<Req, Resp>(&self, service: &str, method: &str, body: &Req) -> Result<Resp, ApiError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        self.cancel.check()?;

        let url = self.method_url(service, method);
        debug!(service, method, "repository call");

        let mut request = self.client.post(url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let exchange = self.cancel.run_blocking(move || {
            let response = request.send().map_err(|e| e.to_string())?;
            let status = response.status();
            let bytes = response
                .bytes()
                .map_err(|e| format!("read body: {e}"))?;
            Ok::<_, String>((status, bytes))
        })?;
        let (status, bytes) =
            exchange.map_err(|e| ApiError::Transport(format!("{service}.{method}: {e}")))?;

        if !status.is_success() {
            return Err(twirp_error(status.as_u16(), &bytes));
        }

        let body: &[u8] = if bytes.is_empty() { b"{}" } else { &bytes };
        serde_json::from_slice(body)
            .map_err(|e| ApiError::Transport(format!("{service}.{method}: decode response: {e}")))
    }

    fn call_unit<Req>(&self, service: &str, method: &str, body: &Req) -> Result<(), ApiError>
    where
        Req: Serialize + ?Sized,
    {
        let _: serde_json::Value = self.call(service, method, body)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TwirpErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    msg: String,
}

/// Map a non-2xx Twirp response onto `ApiError`.
fn twirp_error(status: u16, body: &[u8]) -> ApiError {
    let Ok(err) = serde_json::from_slice::<TwirpErrorBody>(body) else {
        return ApiError::Remote {
            code: format!("http {status}"),
            message: String::from_utf8_lossy(body).trim().to_string(),
        };
    };

    match err.code.as_str() {
        "not_found" => ApiError::NotFound(err.msg),
        "failed_precondition" => ApiError::FailedPrecondition(err.msg),
        "canceled" => ApiError::Cancelled,
        _ => ApiError::Remote {
            code: err.code,
            message: err.msg,
        },
    }
}

// Wire types.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListActiveResponse {
    schemas: Vec<WireSchemaRef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireSchemaRef {
    name: String,
    version: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DocumentTypesResponse {
    types: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetaTypesResponse {
    types: Vec<WireMetaType>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireMetaType {
    name: String,
    used_by: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatusesResponse {
    statuses: Vec<WireStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireStatus {
    name: String,
    disabled: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct WireWorkflow {
    step_zero: String,
    checkpoint: String,
    negative_checkpoint: String,
    steps: Vec<String>,
}

impl From<WireWorkflow> for DocumentWorkflow {
    fn from(w: WireWorkflow) -> Self {
        DocumentWorkflow {
            step_zero: w.step_zero,
            checkpoint: w.checkpoint,
            negative_checkpoint: w.negative_checkpoint,
            steps: w.steps,
        }
    }
}

impl From<&DocumentWorkflow> for WireWorkflow {
    fn from(w: &DocumentWorkflow) -> Self {
        WireWorkflow {
            step_zero: w.step_zero.clone(),
            checkpoint: w.checkpoint.clone(),
            negative_checkpoint: w.negative_checkpoint.clone(),
            steps: w.steps.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WorkflowResponse {
    workflow: Option<WireWorkflow>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetricKindsResponse {
    kinds: Vec<WireMetricKind>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireMetricKind {
    name: String,
    aggregation: Option<WireAggregation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum WireAggregation {
    #[serde(rename = "REPLACE")]
    Replace,
    #[serde(rename = "INCREMENT")]
    Increment,
}

impl From<MetricAggregation> for WireAggregation {
    fn from(a: MetricAggregation) -> Self {
        match a {
            MetricAggregation::Replace => WireAggregation::Replace,
            MetricAggregation::Increment => WireAggregation::Increment,
        }
    }
}

impl From<WireAggregation> for MetricAggregation {
    fn from(a: WireAggregation) -> Self {
        match a {
            WireAggregation::Replace => MetricAggregation::Replace,
            WireAggregation::Increment => MetricAggregation::Increment,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct WireTypeConfiguration {
    bounded_collection: bool,
    time_expressions: Vec<WireTimeExpression>,
    label_expressions: Vec<WireLabelExpression>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct WireTimeExpression {
    expression: String,
    layout: String,
    timezone: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct WireLabelExpression {
    expression: String,
    template: String,
}

impl From<WireTypeConfiguration> for TypeConfigSpec {
    fn from(c: WireTypeConfiguration) -> Self {
        TypeConfigSpec {
            bounded_collection: c.bounded_collection,
            time_expressions: c
                .time_expressions
                .into_iter()
                .map(|e| TimeExpression {
                    expression: e.expression,
                    layout: e.layout,
                    timezone: e.timezone,
                })
                .collect(),
            label_expressions: c
                .label_expressions
                .into_iter()
                .map(|e| LabelExpression {
                    expression: e.expression,
                    template: e.template,
                })
                .collect(),
        }
    }
}

impl From<&TypeConfigSpec> for WireTypeConfiguration {
    fn from(c: &TypeConfigSpec) -> Self {
        WireTypeConfiguration {
            bounded_collection: c.bounded_collection,
            time_expressions: c
                .time_expressions
                .iter()
                .map(|e| WireTimeExpression {
                    expression: e.expression.clone(),
                    layout: e.layout.clone(),
                    timezone: e.timezone.clone(),
                })
                .collect(),
            label_expressions: c
                .label_expressions
                .iter()
                .map(|e| WireLabelExpression {
                    expression: e.expression.clone(),
                    template: e.template.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TypeConfigurationResponse {
    configuration: Option<WireTypeConfiguration>,
}

impl RepositoryApi for TwirpRepository {
    fn list_active_schemas(&self) -> Result<Vec<ActiveSchema>, ApiError> {
        let resp: ListActiveResponse = self.call(SCHEMAS, "ListActive", &json!({}))?;
        Ok(resp
            .schemas
            .into_iter()
            .map(|s| ActiveSchema {
                name: s.name,
                version: s.version,
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
        self.call_unit(
            SCHEMAS,
            "Register",
            &json!({
                "schema": {"name": name, "version": version, "spec": spec},
                "activate": activate,
            }),
        )
    }

    fn activate_schema(&self, name: &str, version: &str) -> Result<(), ApiError> {
        self.call_unit(
            SCHEMAS,
            "SetActive",
            &json!({"name": name, "version": version}),
        )
    }

    fn deactivate_schema(&self, name: &str) -> Result<(), ApiError> {
        self.call_unit(
            SCHEMAS,
            "SetActive",
            &json!({"name": name, "deactivate": true}),
        )
    }

    fn document_types(&self) -> Result<Vec<String>, ApiError> {
        let resp: DocumentTypesResponse = self.call(SCHEMAS, "GetDocumentTypes", &json!({}))?;
        Ok(resp.types)
    }

    fn meta_types(&self) -> Result<Vec<MetaTypeInfo>, ApiError> {
        let resp: MetaTypesResponse = self.call(SCHEMAS, "GetMetaTypes", &json!({}))?;
        Ok(resp
            .types
            .into_iter()
            .map(|m| MetaTypeInfo {
                name: m.name,
                used_by: m.used_by,
            })
            .collect())
    }

    fn register_meta_type(&self, meta_type: &str) -> Result<(), ApiError> {
        self.call_unit(SCHEMAS, "RegisterMetaType", &json!({"type": meta_type}))
    }

    fn register_meta_type_use(&self, main_type: &str, meta_type: &str) -> Result<(), ApiError> {
        self.call_unit(
            SCHEMAS,
            "RegisterMetaTypeUse",
            &json!({"main_type": main_type, "meta_type": meta_type}),
        )
    }

    fn statuses(&self, doc_type: &str) -> Result<Vec<String>, ApiError> {
        let resp: StatusesResponse =
            self.call(WORKFLOWS, "GetStatuses", &json!({"type": doc_type}))?;
        Ok(resp
            .statuses
            .into_iter()
            .filter(|s| !s.disabled)
            .map(|s| s.name)
            .collect())
    }

    fn update_status(
        &self,
        doc_type: &str,
        status: &str,
        disabled: bool,
    ) -> Result<(), ApiError> {
        self.call_unit(
            WORKFLOWS,
            "UpdateStatus",
            &json!({"type": doc_type, "name": status, "disabled": disabled}),
        )
    }

    fn workflow(&self, doc_type: &str) -> Result<DocumentWorkflow, ApiError> {
        let resp: WorkflowResponse =
            self.call(WORKFLOWS, "GetWorkflow", &json!({"type": doc_type}))?;
        resp.workflow
            .map(DocumentWorkflow::from)
            .ok_or_else(|| ApiError::NotFound(format!("no workflow for {doc_type:?}")))
    }

    fn set_workflow(&self, doc_type: &str, workflow: &DocumentWorkflow) -> Result<(), ApiError> {
        self.call_unit(
            WORKFLOWS,
            "SetWorkflow",
            &json!({"type": doc_type, "workflow": WireWorkflow::from(workflow)}),
        )
    }

    fn delete_workflow(&self, doc_type: &str) -> Result<(), ApiError> {
        self.call_unit(WORKFLOWS, "DeleteWorkflow", &json!({"type": doc_type}))
    }

    fn metric_kinds(&self) -> Result<Vec<MetricKindInfo>, ApiError> {
        let resp: MetricKindsResponse = self.call(METRICS, "GetKinds", &json!({}))?;
        Ok(resp
            .kinds
            .into_iter()
            .map(|k| MetricKindInfo {
                name: k.name,
                aggregation: k
                    .aggregation
                    .map(MetricAggregation::from)
                    .unwrap_or(MetricAggregation::Replace),
            })
            .collect())
    }

    fn register_metric_kind(
        &self,
        kind: &str,
        aggregation: MetricAggregation,
    ) -> Result<(), ApiError> {
        self.call_unit(
            METRICS,
            "RegisterKind",
            &json!({"name": kind, "aggregation": WireAggregation::from(aggregation)}),
        )
    }

    fn delete_metric_kind(&self, kind: &str) -> Result<(), ApiError> {
        self.call_unit(METRICS, "DeleteKind", &json!({"name": kind}))
    }

    fn type_configuration(&self, doc_type: &str) -> Result<TypeConfigSpec, ApiError> {
        let resp: TypeConfigurationResponse =
            self.call(SCHEMAS, "GetTypeConfiguration", &json!({"type": doc_type}))?;
        Ok(resp
            .configuration
            .map(TypeConfigSpec::from)
            .unwrap_or_default())
    }

    fn configure_type(&self, doc_type: &str, config: &TypeConfigSpec) -> Result<(), ApiError> {
        self.call_unit(
            SCHEMAS,
            "ConfigureType",
            &json!({"type": doc_type, "configuration": WireTypeConfiguration::from(config)}),
        )
    }
}
