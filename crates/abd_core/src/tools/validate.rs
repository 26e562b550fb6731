//! Checking that a resolved tool actually runs.

use std::path::Path;

use super::Tool;
use crate::error::{BuildError, BuildResult};
use crate::process::ProcessRunner;

/// Run the tool's validation command.
///
/// Accepted when the exit code is benign for this tool or the output
/// contains the tool's identifying text. Anything else, including a failed
/// spawn, is `ToolMissing`. Cancellation passes through unchanged.
pub fn validate_tool(tool: Tool, path: &Path, runner: &ProcessRunner) -> BuildResult<()> {
    let output = match runner.run(tool.name(), path, tool.validation_args()) {
        Ok(output) => output,
        Err(BuildError::Cancelled) => return Err(BuildError::Cancelled),
        Err(e) => {
            tracing::warn!("{} at {} did not start: {}", tool, path.display(), e);
            return Err(BuildError::tool_missing(tool.name()));
        }
    };

    let benign = tool.benign_exit_codes().contains(&output.exit_code);
    let identified = output.combined().contains(tool.identifier());
    if benign || identified {
        Ok(())
    } else {
        tracing::warn!(
            "{} at {} failed validation (exit code {})",
            tool,
            path.display(),
            output.exit_code
        );
        Err(BuildError::tool_missing(tool.name()))
    }
}
