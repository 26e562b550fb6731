//! Synthesize video step - generates the H.264 stream that carries the
//! audio on disc.

use crate::capacity::file_size;
use crate::error::{BuildError, BuildResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{BuildState, Context};
use crate::video::{synthesize_video, VideoRequest};

pub struct SynthesizeVideoStep;

impl SynthesizeVideoStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SynthesizeVideoStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for SynthesizeVideoStep {
    fn name(&self) -> &str {
        "Synthesize video"
    }

    fn progress_range(&self) -> (f64, f64) {
        (0.40, 0.80)
    }

    fn validate_input(&self, _ctx: &Context, state: &BuildState) -> BuildResult<()> {
        super::require(state.tools.as_ref(), "resolved tools")?;
        super::require(state.audio.as_ref(), "prepared audio")?;
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut BuildState) -> BuildResult<()> {
        let tools = super::require(state.tools.as_ref(), "resolved tools")?;
        let audio = super::require(state.audio.as_ref(), "prepared audio")?;
        let build = &ctx.settings.build;

        let work_dir = ctx.work_dir.join("video");
        let request = VideoRequest {
            mode: build.video_mode,
            items: &ctx.items,
            durations: &audio.segment_durations,
            width: build.width,
            height: build.height,
            fps: build.fps,
            frame: &ctx.settings.frame,
            overlays: &ctx.overlays,
            work_dir: &work_dir,
            ffmpeg: &tools.ffmpeg,
        };

        let runner = ctx.tool_runner(tools);
        let video = synthesize_video(&request, &runner, &|fraction, message| {
            self.report(ctx, fraction, message);
        })?;

        let estimate = ctx
            .estimator
            .after_video(file_size(&audio.path), file_size(&video));
        ctx.report_estimate(estimate);
        state.estimate = Some(estimate);
        state.video = Some(video);

        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &BuildState) -> BuildResult<()> {
        let video = super::require(state.video.as_ref(), "video stream")?;
        if !video.exists() {
            return Err(BuildError::custom(format!(
                "Video stream not found: {}",
                video.display()
            )));
        }
        Ok(())
    }
}
