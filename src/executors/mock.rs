//! Mock executor for tests
//!
//! Returns a canned outcome and records every invocation together with the
//! staged document it found on disk at that moment.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::ProcessExecutor;
use crate::types::ProcessOutcome;

/// One recorded call
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Path passed as the single argument
    pub input: PathBuf,
    /// Staged document, if the file was readable JSON when the call happened
    pub staged: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct MockExecutor {
    outcome: ProcessOutcome,
    invocations: Arc<Mutex<Vec<Invocation>>>,
}

impl MockExecutor {
    pub fn new(outcome: ProcessOutcome) -> Self {
        Self {
            outcome,
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Exit 0 with the given stdout
    pub fn with_stdout(stdout: impl Into<String>) -> Self {
        Self::new(ProcessOutcome::Success {
            stdout: stdout.into(),
        })
    }

    /// Exit with `code` and the given stderr
    pub fn failing(code: i32, stderr: impl Into<String>) -> Self {
        Self::new(ProcessOutcome::NonZeroExit {
            code: Some(code),
            stderr: stderr.into(),
        })
    }

    pub fn timing_out() -> Self {
        Self::new(ProcessOutcome::TimedOut)
    }

    pub fn launch_error(message: impl Into<String>) -> Self {
        Self::new(ProcessOutcome::LaunchError {
            message: message.into(),
        })
    }

    /// All recorded invocations, oldest first
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.invocations.lock().map(|calls| calls.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ProcessExecutor for MockExecutor {
    async fn execute(&self, input: &Path) -> ProcessOutcome {
        let staged = std::fs::read_to_string(input)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok());

        if let Ok(mut calls) = self.invocations.lock() {
            calls.push(Invocation {
                input: input.to_path_buf(),
                staged,
            });
        }

        self.outcome.clone()
    }

    fn executor_name(&self) -> &str {
        "mock"
    }
}
