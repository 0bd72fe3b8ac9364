//! Pipeline orchestration - stage, execute, clean up, decode

use serde_json::Value;
use std::path::Path;
use tracing::{error, info, warn};

use crate::decode::decode_plane_output;
use crate::error::ApiError;
use crate::executors::ProcessExecutor;
use crate::staging::StagedArtifact;
use crate::types::{PlaneResult, ProcessOutcome};

/// Stage `request` under `staging_dir`, run the executor on it and remove the
/// staged file before returning. Staging I/O failures come back as
/// `LaunchError`; nothing here returns `Err`.
pub async fn run_ray_tracer(
    executor: &dyn ProcessExecutor,
    staging_dir: &Path,
    request: &Value,
    request_id: &str,
) -> ProcessOutcome {
    let artifact = match StagedArtifact::create(staging_dir, request) {
        Ok(artifact) => artifact,
        Err(e) => {
            error!(
                op = "staging.failed",
                request_id = %request_id,
                staging_dir = %staging_dir.display(),
                error = %e,
                "Failed to stage ray tracer input"
            );
            return ProcessOutcome::LaunchError {
                message: format!("failed to stage input file: {}", e),
            };
        }
    };

    info!(
        op = "ray_tracer.dispatch",
        request_id = %request_id,
        executor = %executor.executor_name(),
        "Dispatching ray tracer run"
    );

    let outcome = executor.execute(artifact.path()).await;
    artifact.cleanup(request_id);

    if !outcome.is_success() {
        warn!(
            op = "ray_tracer.outcome",
            request_id = %request_id,
            outcome = outcome.kind(),
            "Ray tracer run did not succeed"
        );
    }

    outcome
}

/// Full post-validation pipeline: run, classify, decode.
/// Returns the decoded plane and the raw stdout it came from.
pub async fn calculate(
    executor: &dyn ProcessExecutor,
    staging_dir: &Path,
    request: &Value,
    request_id: &str,
) -> Result<(PlaneResult, String), ApiError> {
    let outcome = run_ray_tracer(executor, staging_dir, request, request_id).await;

    let stdout = match outcome {
        ProcessOutcome::Success { stdout } => stdout,
        failed => {
            return Err(ApiError::from_outcome(&failed)
                .unwrap_or_else(|| ApiError::internal("unclassified process outcome")))
        }
    };

    match decode_plane_output(&stdout) {
        Ok(plane) => Ok((plane, stdout)),
        Err(source) => {
            error!(
                op = "decode.failed",
                request_id = %request_id,
                error = %source,
                "Error parsing ray tracer output"
            );
            Err(ApiError::Decode {
                source,
                raw_output: stdout,
            })
        }
    }
}
