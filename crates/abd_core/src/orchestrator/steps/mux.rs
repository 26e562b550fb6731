//! Mux step - runs tsMuxeR into a fresh `BDMV_OUT_*` folder.

use chrono::Local;

use crate::error::{BuildError, BuildResult};
use crate::mux::{create_output_folder, run_tsmuxer};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{BuildState, Context};

pub struct MuxStep;

impl MuxStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MuxStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for MuxStep {
    fn name(&self) -> &str {
        "Mux"
    }

    fn description(&self) -> &str {
        "Multiplex with tsMuxeR"
    }

    fn progress_range(&self) -> (f64, f64) {
        (0.85, 0.98)
    }

    fn validate_input(&self, _ctx: &Context, state: &BuildState) -> BuildResult<()> {
        super::require(state.tools.as_ref(), "resolved tools")?;
        super::require(state.descriptor.as_ref(), "descriptor")?;
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut BuildState) -> BuildResult<()> {
        let tools = super::require(state.tools.as_ref(), "resolved tools")?;
        let descriptor = super::require(state.descriptor.as_ref(), "descriptor")?;

        let disc_dir = create_output_folder(&ctx.output_dir, Local::now())?;
        ctx.logger
            .info(&format!("Output folder: {}", disc_dir.display()));

        run_tsmuxer(&ctx.tool_runner(tools), &tools.tsmuxer, descriptor, &disc_dir)?;
        state.disc_dir = Some(disc_dir);
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &BuildState) -> BuildResult<()> {
        let disc_dir = super::require(state.disc_dir.as_ref(), "disc folder")?;
        if !disc_dir.join("BDMV").is_dir() {
            return Err(BuildError::custom(format!(
                "tsMuxeR produced no BDMV directory in {}",
                disc_dir.display()
            )));
        }
        Ok(())
    }
}
