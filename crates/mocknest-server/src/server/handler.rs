//! The execution handler: one inbound HTTP request in, one mock response out.
//!
//! Pipeline: CORS preflight short-circuit, project lookup by slug, mock
//! resolution, response selection, optional simulated delay, then the
//! response build. Request logging happens off the response path. Every
//! response, success or error, carries permissive CORS headers.

use crate::condition::parse_query_string;
use crate::metrics;
use crate::model::{parse_stored_headers, MockRequest, RequestLog};
use crate::request_log::RequestLogWriter;
use crate::resolver::resolve_mock;
use crate::selector::select_response;
use crate::store::{MockStore, StoreError};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderName, HeaderValue};
use hyper::http::response::Builder;
use hyper::{Request, Response, StatusCode};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

pub(crate) const CORS_ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, PATCH, OPTIONS";

/// Machine-readable error codes returned in the JSON error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecErrorCode {
    ProjectNotFound,
    MockNotFound,
    NoResponseDefined,
    InternalError,
}

impl ExecErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecErrorCode::ProjectNotFound => "PROJECT_NOT_FOUND",
            ExecErrorCode::MockNotFound => "MOCK_NOT_FOUND",
            ExecErrorCode::NoResponseDefined => "NO_RESPONSE_DEFINED",
            ExecErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ExecErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::NOT_FOUND,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ExecErrorCode::ProjectNotFound => "No project exists for this address",
            ExecErrorCode::MockNotFound => "No mock matches this path and method",
            ExecErrorCode::NoResponseDefined => "The matched mock has no responses defined",
            ExecErrorCode::InternalError => "An internal error occurred",
        }
    }

    /// Metric label for this outcome.
    fn outcome(&self) -> &'static str {
        match self {
            ExecErrorCode::ProjectNotFound => "project_not_found",
            ExecErrorCode::MockNotFound => "mock_not_found",
            ExecErrorCode::NoResponseDefined => "no_response_defined",
            ExecErrorCode::InternalError => "internal_error",
        }
    }
}

/// Shared dependencies of the execution handler.
pub struct ExecutionContext {
    pub store: Arc<dyn MockStore>,
    pub log_writer: RequestLogWriter,
}

/// hyper entry point: capture the raw request into a [`MockRequest`] and run
/// the execution pipeline. Infallible; all failures become error envelopes.
pub async fn handle_request(
    ctx: Arc<ExecutionContext>,
    req: Request<Incoming>,
    client_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().as_str().to_ascii_uppercase();

    // Preflight is answered before any lookup or body read.
    if method == "OPTIONS" {
        return Ok(preflight_response());
    }

    let uri = req.uri().clone();
    let raw_query = uri.query().unwrap_or("");

    let mut headers: HashMap<String, String> = HashMap::new();
    for (name, value) in req.headers() {
        headers.insert(
            name.as_str().to_string(),
            value.to_str().unwrap_or("").to_string(),
        );
    }
    let user_agent = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("user-agent"))
        .map(|(_, v)| v.clone());

    let body = match req.into_body().collect().await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            if bytes.is_empty() {
                None
            } else {
                Some(String::from_utf8_lossy(&bytes).into_owned())
            }
        }
        Err(err) => {
            debug!("Failed to read request body: {err}");
            None
        }
    };

    let (slug, mock_path) = split_project_path(uri.path());

    let request = MockRequest {
        method,
        path: mock_path,
        query: parse_query_string(raw_query),
        headers,
        body,
        client_ip: client_addr.ip().to_string(),
        user_agent,
    };

    Ok(execute_mock_request(&ctx, &slug, request).await)
}

/// Split `/slug/rest/of/path` into the project slug and the mock path.
/// A bare `/slug` addresses the mock path `/`.
pub(crate) fn split_project_path(path: &str) -> (String, String) {
    let trimmed = path.trim_start_matches('/');
    match trimmed.split_once('/') {
        Some((slug, rest)) => (slug.to_string(), format!("/{rest}")),
        None => (trimmed.to_string(), "/".to_string()),
    }
}

/// Run the pipeline and flatten storage failures into the opaque
/// `INTERNAL_ERROR` envelope.
pub async fn execute_mock_request(
    ctx: &ExecutionContext,
    slug: &str,
    request: MockRequest,
) -> Response<Full<Bytes>> {
    let started = Instant::now();
    match run_pipeline(ctx, slug, &request, started).await {
        Ok(response) => response,
        Err(err) => {
            error!("Execution failed for {} {}: {err}", request.method, request.path);
            metrics::record_execution(&request.method, ExecErrorCode::InternalError.outcome());
            error_response(ExecErrorCode::InternalError)
        }
    }
}

async fn run_pipeline(
    ctx: &ExecutionContext,
    slug: &str,
    request: &MockRequest,
    started: Instant,
) -> Result<Response<Full<Bytes>>, StoreError> {
    let Some(project) = ctx.store.project_by_slug(slug).await? else {
        metrics::record_execution(&request.method, ExecErrorCode::ProjectNotFound.outcome());
        return Ok(error_response(ExecErrorCode::ProjectNotFound));
    };

    let Some(resolved) = resolve_mock(
        ctx.store.as_ref(),
        &project.id,
        &request.path,
        &request.method,
    )
    .await?
    else {
        // An unmatched path within a known project is recorded; it is the
        // signal users need to debug their mock configuration.
        let code = ExecErrorCode::MockNotFound;
        ctx.log_writer.record(build_log(
            Some(project.id.clone()),
            None,
            request,
            code.status().as_u16(),
            started,
        ));
        metrics::record_execution(&request.method, code.outcome());
        return Ok(error_response(code));
    };

    let responses = ctx.store.responses_for_mock(&resolved.mock.id).await?;
    let Some(selected) = select_response(&responses, request, &resolved.path_params) else {
        metrics::record_execution(&request.method, ExecErrorCode::NoResponseDefined.outcome());
        return Ok(error_response(ExecErrorCode::NoResponseDefined));
    };

    if resolved.mock.response_delay_ms > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(
            resolved.mock.response_delay_ms,
        ))
        .await;
    }

    let status =
        StatusCode::from_u16(selected.status_code).unwrap_or(StatusCode::OK);
    let mut builder = with_cors(Response::builder().status(status));

    // HTTP-invalid names or values in the stored map are skipped so one bad
    // pair cannot poison the builder and take status and CORS down with it.
    let mut custom_headers: Vec<(HeaderName, HeaderValue)> = Vec::new();
    for (name, value) in parse_stored_headers(selected.headers.as_deref()) {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => custom_headers.push((name, value)),
            _ => debug!("Skipping invalid stored header: {name:?}"),
        }
    }
    let has_content_type = custom_headers
        .iter()
        .any(|(name, _)| *name == hyper::header::CONTENT_TYPE);
    if !has_content_type {
        builder = builder.header("Content-Type", resolved.mock.response_type.content_type());
    }
    for (name, value) in custom_headers {
        builder = builder.header(name, value);
    }

    let response = builder
        .body(Full::new(Bytes::from(selected.body.clone())))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from(selected.body.clone()))));

    let elapsed = started.elapsed();
    ctx.log_writer.record(build_log(
        Some(project.id),
        Some(resolved.mock.id),
        request,
        status.as_u16(),
        started,
    ));
    metrics::record_execution(&request.method, "matched");
    metrics::observe_execution_duration(&request.method, elapsed.as_secs_f64() * 1000.0);

    Ok(response)
}

fn build_log(
    project_id: Option<String>,
    mock_id: Option<String>,
    request: &MockRequest,
    response_status: u16,
    started: Instant,
) -> RequestLog {
    RequestLog {
        project_id,
        mock_id,
        method: request.method.clone(),
        path: request.path.clone(),
        headers: serde_json::to_string(&request.headers).unwrap_or_else(|_| "{}".to_string()),
        body: request.body.clone(),
        query: serde_json::to_string(&request.query).unwrap_or_else(|_| "{}".to_string()),
        response_status,
        elapsed_ms: started.elapsed().as_millis() as u64,
        client_ip: request.client_ip.clone(),
        user_agent: request.user_agent.clone(),
        timestamp: chrono::Utc::now(),
    }
}

/// 204 answer to an OPTIONS preflight.
pub(crate) fn preflight_response() -> Response<Full<Bytes>> {
    with_cors(Response::builder().status(StatusCode::NO_CONTENT))
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

fn with_cors(builder: Builder) -> Builder {
    builder
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", CORS_ALLOW_METHODS)
        .header("Access-Control-Allow-Headers", "*")
}

/// Build the JSON error envelope for an execution failure.
pub(crate) fn error_response(code: ExecErrorCode) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": {
            "code": code.as_str(),
            "message": code.message(),
        }
    })
    .to_string();

    with_cors(Response::builder().status(code.status()))
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}
