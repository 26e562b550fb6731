//! Resolve tools step - locates and validates ffmpeg, ffprobe and tsMuxeR.

use crate::error::BuildResult;
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{BuildState, Context};
use crate::tools::{Tool, ToolResolver};

pub struct ResolveToolsStep {
    resolver: ToolResolver,
}

impl ResolveToolsStep {
    pub fn new(resolver: ToolResolver) -> Self {
        Self { resolver }
    }
}

impl PipelineStep for ResolveToolsStep {
    fn name(&self) -> &str {
        "Resolve tools"
    }

    fn description(&self) -> &str {
        "Locate and validate external tools"
    }

    fn progress_range(&self) -> (f64, f64) {
        (0.0, 0.05)
    }

    fn validate_input(&self, _ctx: &Context, _state: &BuildState) -> BuildResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut BuildState) -> BuildResult<()> {
        let tools = self.resolver.resolve_all(&ctx.settings.tools, &ctx.runner)?;
        for tool in Tool::ALL {
            ctx.logger
                .info(&format!("{}: {}", tool, tools.path(tool).display()));
        }
        state.tools = Some(tools);
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &BuildState) -> BuildResult<()> {
        super::require(state.tools.as_ref(), "resolved tools")?;
        Ok(())
    }
}
