//! Prepare audio step - normalises or passes through the tracks into one
//! continuous stream.

use crate::audio::{prepare_audio, AudioRequest};
use crate::capacity::file_size;
use crate::error::{BuildError, BuildResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{BuildState, Context};

pub struct PrepareAudioStep;

impl PrepareAudioStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PrepareAudioStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for PrepareAudioStep {
    fn name(&self) -> &str {
        "Prepare audio"
    }

    fn progress_range(&self) -> (f64, f64) {
        (0.05, 0.40)
    }

    fn validate_input(&self, ctx: &Context, state: &BuildState) -> BuildResult<()> {
        if ctx.items.is_empty() {
            return Err(BuildError::NoItems);
        }
        super::require(state.tools.as_ref(), "resolved tools")?;
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut BuildState) -> BuildResult<()> {
        let tools = super::require(state.tools.as_ref(), "resolved tools")?;
        let build = &ctx.settings.build;

        let estimate = ctx
            .estimator
            .pre_build(&ctx.items, build.codec, build.lpcm_format);
        ctx.report_estimate(estimate);

        ctx.logger.info(&format!(
            "{} track(s) as {}",
            ctx.items.len(),
            build.codec
        ));

        let work_dir = ctx.work_dir.join("audio");
        let request = AudioRequest {
            items: &ctx.items,
            codec: build.codec,
            lpcm_format: build.lpcm_format,
            work_dir: &work_dir,
            ffmpeg: &tools.ffmpeg,
            ffprobe: &tools.ffprobe,
        };

        let runner = ctx.tool_runner(tools);
        let prepared = prepare_audio(&request, &runner, &|done, total| {
            self.report(
                ctx,
                done as f64 / total.max(1) as f64,
                &format!("Prepared track {}/{}", done, total),
            );
        })?;

        ctx.logger.info(&format!(
            "Audio stream {} ({}, {:.3} s)",
            prepared.path.display(),
            prepared.mux_token(),
            prepared.total_duration
        ));

        let estimate = ctx
            .estimator
            .after_audio(file_size(&prepared.path), prepared.total_duration);
        ctx.report_estimate(estimate);
        state.estimate = Some(estimate);
        state.audio = Some(prepared);

        Ok(())
    }

    fn validate_output(&self, ctx: &Context, state: &BuildState) -> BuildResult<()> {
        let audio = super::require(state.audio.as_ref(), "prepared audio")?;
        if !audio.path.exists() {
            return Err(BuildError::custom(format!(
                "Prepared audio not found: {}",
                audio.path.display()
            )));
        }
        let expected = if audio.codec.is_passthrough() { 1 } else { ctx.items.len() };
        if audio.segment_durations.len() != expected {
            return Err(BuildError::custom(format!(
                "Expected {} segment duration(s), got {}",
                expected,
                audio.segment_durations.len()
            )));
        }
        Ok(())
    }
}
