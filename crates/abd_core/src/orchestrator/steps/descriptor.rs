//! Descriptor step - writes the tsMuxeR `.meta` file.

use crate::error::BuildResult;
use crate::mux::{write_descriptor, DESCRIPTOR_NAME};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{BuildState, Context};

pub struct DescriptorStep;

impl DescriptorStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DescriptorStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for DescriptorStep {
    fn name(&self) -> &str {
        "Descriptor"
    }

    fn description(&self) -> &str {
        "Write mux descriptor"
    }

    fn progress_range(&self) -> (f64, f64) {
        (0.82, 0.85)
    }

    fn validate_input(&self, _ctx: &Context, state: &BuildState) -> BuildResult<()> {
        super::require(state.audio.as_ref(), "prepared audio")?;
        super::require(state.video.as_ref(), "video stream")?;
        super::require(state.chapters.as_ref(), "chapters")?;
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut BuildState) -> BuildResult<()> {
        let audio = super::require(state.audio.as_ref(), "prepared audio")?;
        let video = super::require(state.video.as_ref(), "video stream")?;
        let chapters = super::require(state.chapters.as_ref(), "chapters")?;

        let path = ctx.work_dir.join(DESCRIPTOR_NAME);
        let text = write_descriptor(&path, video, audio, ctx.settings.build.fps, &chapters.path)?;
        if ctx.settings.logging.show_descriptor {
            ctx.logger.file_contents(DESCRIPTOR_NAME, &text);
        }

        state.descriptor = Some(path);
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &BuildState) -> BuildResult<()> {
        super::require(state.descriptor.as_ref(), "descriptor")?;
        Ok(())
    }
}
