//! Wire types shared by the pipeline and the HTTP handlers

use serde::Serialize;
use std::path::PathBuf;

// =============================================================================
// Process Outcome
// =============================================================================

/// How one ray tracer invocation concluded.
/// Failures are data: the runner never returns them as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Exit code 0
    Success { stdout: String },
    /// Non-zero exit, or killed by a signal (`code` is `None`)
    NonZeroExit { code: Option<i32>, stderr: String },
    /// Deadline exceeded; the child was killed
    TimedOut,
    /// The process could not be started, or its input could not be staged
    LaunchError { message: String },
}

impl ProcessOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessOutcome::Success { .. })
    }

    /// Short label for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessOutcome::Success { .. } => "success",
            ProcessOutcome::NonZeroExit { .. } => "non_zero_exit",
            ProcessOutcome::TimedOut => "timed_out",
            ProcessOutcome::LaunchError { .. } => "launch_error",
        }
    }
}

// =============================================================================
// Decoded Output
// =============================================================================

/// Structured view of the ray tracer's stdout. Absent fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaneResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Temperature values from the last numeric data line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
}

// =============================================================================
// API Responses
// =============================================================================

/// Response body for /calculate and /test, success and failure alike
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plane_info: Option<PlaneResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Built-in sample payload, only on /test
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_data: Option<serde_json::Value>,
    /// Route listing, only on 404
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_endpoints: Option<Vec<&'static str>>,
}

impl ApiResponse {
    pub fn success(plane_info: PlaneResult, raw_output: String) -> Self {
        Self {
            success: true,
            plane_info: Some(plane_info),
            raw_output: Some(raw_output),
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

/// GET /health
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// GET /status
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub ray_tracer_binary: PathBuf,
    pub binary_exists: bool,
    pub binary_executable: bool,
    pub max_request_size: usize,
    pub port: u16,
}
