//! Chapters step - one chapter mark per track.

use crate::chapters::write_chapter_file;
use crate::error::BuildResult;
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{BuildState, ChaptersOutput, Context};

/// Chapter file name inside the workspace.
pub const CHAPTERS_NAME: &str = "chapters.txt";

pub struct ChaptersStep;

impl ChaptersStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ChaptersStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ChaptersStep {
    fn name(&self) -> &str {
        "Chapters"
    }

    fn description(&self) -> &str {
        "Write chapter marks"
    }

    fn progress_range(&self) -> (f64, f64) {
        (0.80, 0.82)
    }

    fn validate_input(&self, _ctx: &Context, state: &BuildState) -> BuildResult<()> {
        super::require(state.audio.as_ref(), "prepared audio")?;
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut BuildState) -> BuildResult<()> {
        let audio = super::require(state.audio.as_ref(), "prepared audio")?;
        let path = ctx.work_dir.join(CHAPTERS_NAME);
        let marks = write_chapter_file(&path, &audio.segment_durations)?;
        ctx.logger
            .info(&format!("{} chapter(s) written to {}", marks.len(), path.display()));
        state.chapters = Some(ChaptersOutput { path, marks });
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &BuildState) -> BuildResult<()> {
        let chapters = super::require(state.chapters.as_ref(), "chapters")?;
        if chapters.marks.first().map(|m| m.start_ms) != Some(0) {
            return Err(crate::error::BuildError::custom(
                "First chapter does not start at 00:00:00.000",
            ));
        }
        Ok(())
    }
}
