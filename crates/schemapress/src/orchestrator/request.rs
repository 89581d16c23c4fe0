//! JSON request dispatch.
//!
//! A request is `{"command": ..., "details": {...}, "requestId": ...}` and is
//! answered with `{"success": ..., "payload": ..., "error": ..., "requestId": ...}`.
//! The command set is closed: anything outside [`Request`] fails to parse
//! and is answered with an error response.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::Orchestrator;
use crate::config::SourceConfig;
use crate::error::{PressError, Result};
use crate::manifest;

/// A compiler request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", content = "details", rename_all = "camelCase")]
pub enum Request {
    /// Capture a live schema into a manifest.
    Introspect(IntrospectDetails),
    /// Compile a manifest into installer sources.
    Compile(CompileDetails),
    /// Check a manifest without compiling it.
    ValidateManifest(ValidateDetails),
}

/// Overrides applied on top of the loaded configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectDetails {
    #[serde(default)]
    pub connection: Option<SourceConfig>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub include_seed_data: Option<bool>,
    #[serde(default)]
    pub row_limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileDetails {
    pub manifest: Value,
    #[serde(default)]
    pub class_name: Option<String>,
    /// Also write the generated files here.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateDetails {
    pub manifest: Value,
    #[serde(default)]
    pub class_name: Option<String>,
}

/// Answer to a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl Response {
    pub fn ok(request_id: Option<String>, payload: Value) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            error: None,
            request_id,
        }
    }

    pub fn failed(request_id: Option<String>, error: &PressError) -> Self {
        Self {
            success: false,
            payload: None,
            error: Some(error.to_string()),
            request_id,
        }
    }
}

/// Split a request document into its id and the parsed request.
///
/// The id is recovered even when the command itself is unknown.
pub fn parse_request(text: &str) -> (Option<String>, Result<Request>) {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => return (None, Err(e.into())),
    };
    let request_id = match value.get("requestId") {
        Some(Value::String(id)) => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    };
    let request = serde_json::from_value(value).map_err(PressError::from);
    (request_id, request)
}

/// Parse and run one request document.
pub async fn handle(orchestrator: &Orchestrator, text: &str) -> Response {
    match parse_request(text) {
        (request_id, Ok(request)) => dispatch(orchestrator, request, request_id).await,
        (request_id, Err(e)) => {
            warn!("Rejected request: {}", e);
            Response::failed(request_id, &e)
        }
    }
}

/// Run a parsed request.
pub async fn dispatch(
    orchestrator: &Orchestrator,
    request: Request,
    request_id: Option<String>,
) -> Response {
    debug!("Dispatching request {:?}", request_id);
    let result = match request {
        Request::Introspect(details) => introspect(orchestrator, details).await,
        Request::Compile(details) => compile(orchestrator, details),
        Request::ValidateManifest(details) => {
            return validate(orchestrator, details, request_id);
        }
    };

    match result {
        Ok(payload) => Response::ok(request_id, payload),
        Err(e) => Response::failed(request_id, &e),
    }
}

#[cfg(feature = "mysql")]
async fn introspect(orchestrator: &Orchestrator, details: IntrospectDetails) -> Result<Value> {
    let mut config = orchestrator.config.clone();
    if let Some(connection) = details.connection {
        config.source = Some(connection);
    }
    if let Some(prefix) = details.prefix {
        config.introspection.prefix = prefix;
    }
    if let Some(include) = details.include_seed_data {
        config.introspection.include_seed_data = include;
    }
    if let Some(limit) = details.row_limit {
        config.introspection.default_row_limit = limit;
    }
    config.validate()?;

    let scoped = Orchestrator::new(config).with_cancellation(orchestrator.cancel.clone());
    let manifest = scoped.introspect().await?;
    Ok(serde_json::to_value(&manifest)?)
}

#[cfg(not(feature = "mysql"))]
async fn introspect(_orchestrator: &Orchestrator, _details: IntrospectDetails) -> Result<Value> {
    Err(PressError::Config(
        "introspection requires the `mysql` feature".into(),
    ))
}

fn compile(orchestrator: &Orchestrator, details: CompileDetails) -> Result<Value> {
    let manifest = manifest::from_value(details.manifest)?;
    let class_name = details.class_name.as_deref();

    let (compiled, written) = match &details.output_dir {
        Some(dir) => orchestrator.compile_to(&manifest, class_name, dir)?,
        None => (orchestrator.compile(&manifest, class_name)?, Vec::new()),
    };

    let mut payload = serde_json::to_value(&compiled)?;
    if let Value::Object(map) = &mut payload {
        let written: Vec<String> = written.iter().map(|p| p.display().to_string()).collect();
        map.insert("written".to_string(), Value::from(written));
    }
    Ok(payload)
}

fn validate(
    orchestrator: &Orchestrator,
    details: ValidateDetails,
    request_id: Option<String>,
) -> Response {
    let manifest = match manifest::from_value(details.manifest) {
        Ok(manifest) => manifest,
        Err(e) => return Response::failed(request_id, &e),
    };

    let report = orchestrator.validate(&manifest, details.class_name.as_deref());
    let error = (!report.is_valid()).then(|| report.errors.join("; "));
    match serde_json::to_value(&report) {
        Ok(payload) => Response {
            success: error.is_none(),
            payload: Some(payload),
            error,
            request_id,
        },
        Err(e) => Response::failed(request_id, &e.into()),
    }
}
