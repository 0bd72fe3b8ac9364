//! API error taxonomy
//!
//! Every failure a request can hit, mapped to an HTTP status and a JSON body.
//! Client input errors are raised before anything is staged or spawned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::decode::DecodeError;
use crate::types::{ApiResponse, ProcessOutcome};
use crate::validate::InvalidInput;

/// Routes listed in 404 responses
pub const AVAILABLE_ENDPOINTS: [&str; 4] = [
    "GET /health",
    "GET /status",
    "POST /calculate",
    "POST /test",
];

#[derive(Error, Debug)]
pub enum ApiError {
    // === Client input ===
    #[error("No JSON data provided")]
    NoData,

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    #[error("Request too large. Maximum size: {max} bytes")]
    TooLarge { max: usize },

    // === External process ===
    #[error("Ray tracer execution failed: {stderr}")]
    ExecutionFailed { code: Option<i32>, stderr: String },

    #[error("Ray tracer execution timed out")]
    TimedOut,

    #[error("Error running ray tracer: {0}")]
    Launch(String),

    // === Output decoding ===
    #[error("Error parsing results: {source}")]
    Decode {
        #[source]
        source: DecodeError,
        raw_output: String,
    },

    // === Routing ===
    #[error("Endpoint not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Detail is logged, never sent to the client
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    /// Wrap any unexpected fault. The detail stays server-side.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        ApiError::Internal(detail.to_string())
    }

    /// Failure variant for a non-success process outcome, `None` on success
    pub fn from_outcome(outcome: &ProcessOutcome) -> Option<Self> {
        match outcome {
            ProcessOutcome::Success { .. } => None,
            ProcessOutcome::NonZeroExit { code, stderr } => Some(ApiError::ExecutionFailed {
                code: *code,
                stderr: stderr.clone(),
            }),
            ProcessOutcome::TimedOut => Some(ApiError::TimedOut),
            ProcessOutcome::LaunchError { message } => Some(ApiError::Launch(message.clone())),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NoData | ApiError::InvalidJson(_) | ApiError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::ExecutionFailed { .. }
            | ApiError::TimedOut
            | ApiError::Launch(_)
            | ApiError::Decode { .. }
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable code for log lines
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NoData => "NO_DATA",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::TooLarge { .. } => "REQUEST_TOO_LARGE",
            ApiError::ExecutionFailed { .. } => "EXECUTION_FAILED",
            ApiError::TimedOut => "EXECUTION_TIMEOUT",
            ApiError::Launch(_) => "LAUNCH_FAILED",
            ApiError::Decode { .. } => "PARSE_FAILED",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// JSON body for this error
    pub fn to_body(&self) -> ApiResponse {
        let mut body = ApiResponse::error(self.to_string());
        match self {
            ApiError::Decode { raw_output, .. } => body.raw_output = Some(raw_output.clone()),
            ApiError::NotFound => body.available_endpoints = Some(AVAILABLE_ENDPOINTS.to_vec()),
            _ => {}
        }
        body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!(op = "api.internal_error", error = %detail, "Internal server error");
        }
        (self.status(), Json(self.to_body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_error_messages() {
        assert_eq!(ApiError::NoData.to_string(), "No JSON data provided");
        assert_eq!(
            ApiError::from(InvalidInput::MissingField("polygons")).to_string(),
            "Invalid input: Missing required field: polygons"
        );
        assert_eq!(
            ApiError::TooLarge { max: 5242880 }.to_string(),
            "Request too large. Maximum size: 5242880 bytes"
        );
        assert_eq!(ApiError::InvalidJson("eof".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::TooLarge { max: 1 }.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_outcome_mapping() {
        assert!(ApiError::from_outcome(&ProcessOutcome::Success { stdout: String::new() }).is_none());

        let err = ApiError::from_outcome(&ProcessOutcome::NonZeroExit {
            code: Some(2),
            stderr: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(err.to_string(), "Ray tracer execution failed: boom");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = ApiError::from_outcome(&ProcessOutcome::TimedOut).unwrap();
        assert_eq!(err.to_string(), "Ray tracer execution timed out");

        let err = ApiError::from_outcome(&ProcessOutcome::LaunchError {
            message: "No such file or directory".to_string(),
        })
        .unwrap();
        assert_eq!(err.to_string(), "Error running ray tracer: No such file or directory");
    }

    #[test]
    fn test_decode_error_body_carries_raw_output() {
        let source = crate::decode::decode_plane_output("Width: x\n").unwrap_err();
        let err = ApiError::Decode {
            source,
            raw_output: "Width: x\n".to_string(),
        };
        let body = serde_json::to_value(err.to_body()).unwrap();
        assert!(body["error"].as_str().unwrap().starts_with("Error parsing results: "));
        assert_eq!(body["raw_output"], json!("Width: x\n"));
    }

    #[test]
    fn test_not_found_lists_endpoints() {
        let body = serde_json::to_value(ApiError::NotFound.to_body()).unwrap();
        assert_eq!(body["error"], json!("Endpoint not found"));
        assert_eq!(body["available_endpoints"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let err = ApiError::internal("panicked at src/dispatch.rs:42");
        let json = serde_json::to_string(&err.to_body()).unwrap();
        assert!(json.contains("Internal server error"));
        assert!(!json.contains("dispatch.rs"), "Leaked detail: {}", json);
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }
}
