//! HTTP surface
//!
//! - GET  /health     fixed liveness payload
//! - GET  /status     configuration and binary checks
//! - POST /calculate  validate -> stage -> run -> decode
//! - POST /test       same pipeline on a built-in sample payload
//!
//! Unknown paths get 404 with the route list, known paths with the wrong
//! method get 405. Panics are caught at the top and reported as a generic 500.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::{json, Value};
use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::dispatch;
use crate::error::ApiError;
use crate::executors::{ProcessExecutor, SubprocessExecutor};
use crate::types::{ApiResponse, HealthResponse, PlaneResult, StatusResponse};
use crate::validate::validate_request;

pub const SERVICE_NAME: &str = "ray-tracer-api";

// =============================================================================
// State
// =============================================================================

/// Shared, read-only per-process state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub executor: Arc<dyn ProcessExecutor>,
}

impl AppState {
    pub fn new(config: ServerConfig, executor: Arc<dyn ProcessExecutor>) -> Self {
        Self {
            config: Arc::new(config),
            executor,
        }
    }

    /// State backed by the real ray tracer binary
    pub fn from_config(config: ServerConfig) -> Self {
        let executor = Arc::new(SubprocessExecutor::from_config(&config));
        Self::new(config, executor)
    }
}

// =============================================================================
// Router
// =============================================================================

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler).fallback(method_not_allowed))
        .route("/status", get(status_handler).fallback(method_not_allowed))
        .route("/calculate", post(calculate_handler).fallback(method_not_allowed))
        .route("/test", post(test_handler).fallback(method_not_allowed))
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    ApiError::internal(format!("handler panicked: {}", detail)).into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /health
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /status
async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let binary = state.config.resolved_binary();
    Json(StatusResponse {
        status: "running",
        binary_exists: binary.exists(),
        binary_executable: is_executable(&binary),
        ray_tracer_binary: binary,
        max_request_size: state.config.max_request_size,
        port: state.config.port,
    })
}

/// POST /calculate
async fn calculate_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<ApiResponse>, ApiError> {
    let request_id = new_request_id();

    let data = read_json_body(&headers, body, state.config.max_request_size)
        .await
        .map_err(|e| log_failure("calculate.rejected", &request_id, e))?;

    validate_request(&data)
        .map_err(|e| log_failure("calculate.invalid_input", &request_id, e.into()))?;

    info!(op = "calculate.request", request_id = %request_id, "Processing calculation request");

    let (plane, raw_output) = run_pipeline(&state, data, request_id.clone())
        .await
        .map_err(|e| log_failure("calculate.failed", &request_id, e))?;

    info!(op = "calculate.ok", request_id = %request_id, "Calculation completed successfully");
    Ok(Json(ApiResponse::success(plane, raw_output)))
}

/// POST /test - request body is ignored
async fn test_handler(State(state): State<AppState>) -> Response {
    let request_id = new_request_id();
    let sample = sample_request();

    info!(op = "test.request", request_id = %request_id, "Running built-in sample");

    match run_pipeline(&state, sample.clone(), request_id.clone()).await {
        Ok((plane, raw_output)) => {
            let mut body = ApiResponse::success(plane, raw_output);
            body.test_data = Some(sample);
            Json(body).into_response()
        }
        Err(e) => {
            let e = log_failure("test.failed", &request_id, e);
            let mut body = e.to_body();
            body.test_data = Some(sample);
            (e.status(), Json(body)).into_response()
        }
    }
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

// =============================================================================
// Helpers
// =============================================================================

/// Run the pipeline on its own task: a client hanging up does not cancel
/// the run, and a panic inside it becomes an internal error.
async fn run_pipeline(
    state: &AppState,
    request: Value,
    request_id: String,
) -> Result<(PlaneResult, String), ApiError> {
    let executor = state.executor.clone();
    let staging_dir = state.config.staging_dir.clone();

    tokio::spawn(async move {
        dispatch::calculate(executor.as_ref(), &staging_dir, &request, &request_id).await
    })
    .await
    .map_err(ApiError::internal)?
}

/// Read the body under the size cap and parse it as JSON.
async fn read_json_body(headers: &HeaderMap, body: Body, limit: usize) -> Result<Value, ApiError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    if declared.is_some_and(|len| len > limit as u64) {
        return Err(ApiError::TooLarge { max: limit });
    }

    let bytes = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => return Err(ApiError::TooLarge { max: limit }),
        Err(e) => return Err(ApiError::internal(format!("failed to read request body: {}", e))),
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::NoData);
    }

    let data: Value =
        serde_json::from_slice(&bytes).map_err(|e| ApiError::InvalidJson(e.to_string()))?;

    if is_empty_document(&data) {
        return Err(ApiError::NoData);
    }

    Ok(data)
}

/// Documents that carry nothing: null, false, 0, "", [] and {}
fn is_empty_document(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn log_failure(op: &'static str, request_id: &str, err: ApiError) -> ApiError {
    warn!(
        op = op,
        request_id = %request_id,
        code = err.code(),
        status = err.status().as_u16(),
        error = ?err,
        "Request failed"
    );
    err
}

fn new_request_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Payload used by POST /test
pub fn sample_request() -> Value {
    json!({
        "receiver_planes": {
            "plane1": {
                "width": 2.0,
                "height": 2.0,
                "points": [
                    {
                        "origin": [0.0, 0.0, 0.0],
                        "normal": [0.0, 1.0, 0.0]
                    }
                ]
            }
        },
        "polygons": [
            {
                "polygon": [
                    [0.0, 1.0, 0.0],
                    [1.0, 1.0, 0.0],
                    [1.0, 1.0, 1.0],
                    [0.0, 1.0, 1.0]
                ],
                "temperature": 100.0
            }
        ],
        "num_rays": 1000
    })
}
