//! Finalize step - completes the disc folder and measures it.

use crate::error::BuildResult;
use crate::mux::ensure_certificate_dir;
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{BuildState, Context};

pub struct FinalizeStep;

impl FinalizeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FinalizeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for FinalizeStep {
    fn name(&self) -> &str {
        "Finalize"
    }

    fn description(&self) -> &str {
        "Finish disc folder"
    }

    fn progress_range(&self) -> (f64, f64) {
        (0.98, 1.0)
    }

    fn validate_input(&self, _ctx: &Context, state: &BuildState) -> BuildResult<()> {
        super::require(state.disc_dir.as_ref(), "disc folder")?;
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut BuildState) -> BuildResult<()> {
        let disc_dir = super::require(state.disc_dir.as_ref(), "disc folder")?;
        ensure_certificate_dir(disc_dir)?;

        let estimate = ctx.estimator.final_size(disc_dir)?;
        ctx.report_estimate(estimate);
        let capacity = ctx.settings.build.disc_capacity;
        if capacity.is_exceeded_by(estimate.bytes) {
            ctx.logger.warn(&format!(
                "Output is larger than a {} disc ({} > {} bytes)",
                capacity,
                estimate.bytes,
                capacity.bytes()
            ));
        }
        state.estimate = Some(estimate);
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &BuildState) -> BuildResult<()> {
        let disc_dir = super::require(state.disc_dir.as_ref(), "disc folder")?;
        if !disc_dir.join("CERTIFICATE").is_dir() {
            return Err(crate::error::BuildError::custom("CERTIFICATE directory missing"));
        }
        Ok(())
    }
}
