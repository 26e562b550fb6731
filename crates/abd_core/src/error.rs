//! Build error taxonomy.
//!
//! Every stage below the orchestrator returns [`BuildError`]. The
//! orchestrator wraps it with step context in `PipelineError`.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised by individual build stages.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The track list is empty.
    #[error("No audio items to build")]
    NoItems,

    /// Pass-through output needs exactly one input track.
    #[error("Pass-through requires exactly one elementary stream, got {count} tracks")]
    ExpectedSingleElementaryStream { count: usize },

    /// Input is neither a raw TrueHD stream nor a container holding TrueHD.
    #[error("Expected a TrueHD/Atmos stream: {}", file.display())]
    ExpectedTrueHd { file: PathBuf },

    /// Input is neither a raw DTS-HD stream nor a container holding DTS.
    #[error("Expected a DTS-HD MA stream: {}", file.display())]
    ExpectedDtsHd { file: PathBuf },

    /// A required external tool could not be resolved or validated.
    #[error("Required tool '{tool}' is missing or not working")]
    ToolMissing { tool: String },

    /// The user cancelled the build.
    #[error("Build cancelled")]
    Cancelled,

    /// Stage-specific failure with a descriptive message.
    #[error("{0}")]
    Custom(String),

    /// An external process exited unsuccessfully.
    #[error("{tool} failed with exit code {exit_code}: {output}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        output: String,
    },

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// Output folder does not fit the selected disc.
    #[error("Output is {size} bytes, exceeding the {budget} byte disc budget by {} bytes", size.saturating_sub(*budget))]
    CapacityExceeded { size: u64, budget: u64 },
}

impl BuildError {
    /// Create a custom stage error.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Create a tool missing error.
    pub fn tool_missing(tool: impl Into<String>) -> Self {
        Self::ToolMissing { tool: tool.into() }
    }

    /// Create a command failed error.
    pub fn command_failed(
        tool: impl Into<String>,
        exit_code: i32,
        output: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            tool: tool.into(),
            exit_code,
            output: output.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create an expected-TrueHD error for a file.
    pub fn expected_truehd(file: &Path) -> Self {
        Self::ExpectedTrueHd {
            file: file.to_path_buf(),
        }
    }

    /// Create an expected-DTS-HD error for a file.
    pub fn expected_dtshd(file: &Path) -> Self {
        Self::ExpectedDtsHd {
            file: file.to_path_buf(),
        }
    }

    /// Whether this error represents a user cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type for build stages.
pub type BuildResult<T> = Result<T, BuildError>;
