//! Process executors
//!
//! The ray tracer is reached only through [`ProcessExecutor`], so the
//! pipeline can run against a stub without spawning anything.

pub mod mock;
pub mod subprocess;

use async_trait::async_trait;
use std::path::Path;

use crate::types::ProcessOutcome;

pub use mock::MockExecutor;
pub use subprocess::SubprocessExecutor;

/// Runs the ray tracer against one staged input file
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Execute with `input` as the single argument.
    /// Every failure mode is reported in the returned outcome.
    async fn execute(&self, input: &Path) -> ProcessOutcome;

    /// Executor name for logs
    fn executor_name(&self) -> &str;
}
