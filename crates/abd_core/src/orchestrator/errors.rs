//! Error types for the build pipeline.
//!
//! Errors carry context that chains through layers:
//! Build → Step → Stage error

use thiserror::Error;

use crate::error::BuildError;

/// Top-level pipeline error.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed during execution.
    #[error("Build failed at step '{step}': {source}")]
    StepFailed {
        step: String,
        #[source]
        source: BuildError,
    },

    /// The build was cancelled.
    #[error("Build was cancelled")]
    Cancelled,

    /// Another build is still running.
    #[error("A build is already running")]
    AlreadyRunning,

    /// Failed to set up the build (workspace, logger).
    #[error("Build setup failed: {message}")]
    SetupFailed { message: String },
}

impl PipelineError {
    /// Wrap a stage error with the step name.
    ///
    /// A cancelled stage becomes [`PipelineError::Cancelled`].
    pub fn step_failed(step: impl Into<String>, source: BuildError) -> Self {
        if source.is_cancelled() {
            return Self::Cancelled;
        }
        Self::StepFailed {
            step: step.into(),
            source,
        }
    }

    /// Create a setup failed error.
    pub fn setup_failed(message: impl Into<String>) -> Self {
        Self::SetupFailed {
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_failure_chains_context() {
        let err = PipelineError::step_failed(
            "Mux",
            BuildError::command_failed("tsMuxeR", 1, "bad meta"),
        );
        let msg = err.to_string();
        assert!(msg.contains("Mux"));
        assert!(msg.contains("tsMuxeR"));
    }

    #[test]
    fn cancelled_stage_is_pipeline_cancel() {
        let err = PipelineError::step_failed("Prepare audio", BuildError::Cancelled);
        assert!(err.is_cancelled());
    }
}
