//! Audio preparation.
//!
//! Produces the single continuous audio stream of a build:
//! - LPCM: every track normalised to one PCM format, then joined
//! - TrueHD / DTS-HD: one elementary stream carried without re-encoding

mod lpcm;
mod passthrough;

use std::path::Path;

pub use lpcm::{concat_list, pcm_codec, target_channels, LpcmPlan};

use crate::error::{BuildError, BuildResult};
use crate::models::{AudioItem, LpcmFormat, OutputCodec, PreparedAudio};
use crate::process::ProcessRunner;

/// Inputs of the audio stage.
#[derive(Debug, Clone, Copy)]
pub struct AudioRequest<'a> {
    /// Tracks in disc order.
    pub items: &'a [AudioItem],
    pub codec: OutputCodec,
    /// LPCM target; `None` resolves from the sources.
    pub lpcm_format: Option<LpcmFormat>,
    /// Directory for intermediate files.
    pub work_dir: &'a Path,
    pub ffmpeg: &'a Path,
    pub ffprobe: &'a Path,
}

/// Prepare the audio stream for a build.
///
/// `on_track(done, total)` fires once per converted track.
pub fn prepare_audio(
    request: &AudioRequest<'_>,
    runner: &ProcessRunner,
    on_track: &dyn Fn(usize, usize),
) -> BuildResult<PreparedAudio> {
    if request.items.is_empty() {
        return Err(BuildError::NoItems);
    }

    match request.codec {
        OutputCodec::Lpcm => lpcm::prepare_lpcm(request, runner, on_track),
        OutputCodec::TrueHd | OutputCodec::DtsHd => {
            let prepared = passthrough::prepare_passthrough(request, runner)?;
            on_track(1, 1);
            Ok(prepared)
        }
    }
}

/// Duration of a track, probing `fallback` when the import probe had none.
fn duration_or_probe(
    item: &AudioItem,
    fallback: &Path,
    request: &AudioRequest<'_>,
    runner: &ProcessRunner,
) -> BuildResult<f64> {
    if let Some(duration) = item.duration_secs() {
        return Ok(duration);
    }

    tracing::debug!(
        "No probed duration for {}, probing {}",
        item.path.display(),
        fallback.display()
    );
    crate::probe::probe_file(runner, request.ffprobe, fallback)?
        .duration_secs
        .ok_or_else(|| {
            BuildError::custom(format!(
                "Could not determine the duration of {}",
                item.path.display()
            ))
        })
}
