//! LPCM normalisation and joining.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use super::{duration_or_probe, AudioRequest};
use crate::error::{BuildError, BuildResult};
use crate::models::{AudioItem, LpcmFormat, OutputCodec, PreparedAudio};
use crate::process::ProcessRunner;

/// Name of the joined stream inside the work directory.
pub const JOINED_NAME: &str = "audio_joined.wav";

/// Target PCM format for every track of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LpcmPlan {
    pub format: LpcmFormat,
    pub sample_rate: u32,
    pub bit_depth: u8,
    pub channels: u8,
}

impl LpcmPlan {
    /// Plan for these items. `format = None` resolves from the sources.
    pub fn for_items(items: &[AudioItem], format: Option<LpcmFormat>) -> Self {
        let format = format.unwrap_or_else(|| {
            let rates: Vec<Option<u32>> = items.iter().map(|i| i.attributes.sample_rate).collect();
            LpcmFormat::for_sources(&rates)
        });
        Self {
            format,
            sample_rate: format.sample_rate(),
            bit_depth: format.bit_depth(),
            channels: target_channels(items),
        }
    }

    /// ffmpeg output options for this format.
    fn output_args(&self) -> Vec<OsString> {
        [
            "-ac".to_string(),
            self.channels.to_string(),
            "-ar".to_string(),
            self.sample_rate.to_string(),
            "-c:a".to_string(),
            pcm_codec(self.bit_depth).to_string(),
            "-rf64".to_string(),
            "auto".to_string(),
        ]
        .into_iter()
        .map(OsString::from)
        .collect()
    }
}

/// Highest channel count among the tracks, 2 when none is known.
///
/// Layouts are not remixed; mixed channel counts all go to the maximum.
pub fn target_channels(items: &[AudioItem]) -> u8 {
    items
        .iter()
        .filter_map(|i| i.attributes.channels)
        .max()
        .unwrap_or(2)
}

/// Packed little-endian PCM codec for a bit depth.
pub fn pcm_codec(bit_depth: u8) -> &'static str {
    if bit_depth <= 16 {
        "pcm_s16le"
    } else {
        "pcm_s24le"
    }
}

/// ffmpeg concat demuxer list for these files.
pub fn concat_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', "'\\''")))
        .collect()
}

fn convert_args(source: &Path, target: &Path, plan: &LpcmPlan) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-hide_banner", "-i"].map(OsString::from).to_vec();
    args.push(source.as_os_str().to_os_string());
    args.extend(["-map", "0:a:0", "-vn"].map(OsString::from));
    args.extend(plan.output_args());
    args.push(target.as_os_str().to_os_string());
    args
}

fn concat_args(list: &Path, target: &Path, plan: &LpcmPlan) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-hide_banner", "-f", "concat", "-safe", "0", "-i"]
        .map(OsString::from)
        .to_vec();
    args.push(list.as_os_str().to_os_string());
    args.extend(plan.output_args());
    args.push(target.as_os_str().to_os_string());
    args
}

/// Convert every track, then join them by re-encoding.
pub(super) fn prepare_lpcm(
    request: &AudioRequest<'_>,
    runner: &ProcessRunner,
    on_track: &dyn Fn(usize, usize),
) -> BuildResult<PreparedAudio> {
    let plan = LpcmPlan::for_items(request.items, request.lpcm_format);
    tracing::info!(
        "LPCM target: {} ({} ch)",
        plan.format,
        plan.channels
    );

    fs::create_dir_all(request.work_dir)
        .map_err(|e| BuildError::io("creating audio work directory", e))?;

    let total = request.items.len();
    let mut intermediates = Vec::with_capacity(total);
    let mut durations = Vec::with_capacity(total);

    for (index, item) in request.items.iter().enumerate() {
        let target = request.work_dir.join(format!("track_{:03}.wav", index + 1));
        runner.run_checked(
            "ffmpeg",
            request.ffmpeg,
            convert_args(&item.path, &target, &plan),
        )?;
        durations.push(duration_or_probe(item, &target, request, runner)?);
        intermediates.push(target);
        on_track(index + 1, total);
    }

    let list_path = request.work_dir.join("concat_audio.txt");
    fs::write(&list_path, concat_list(&intermediates))
        .map_err(|e| BuildError::io("writing audio concat list", e))?;

    let joined = request.work_dir.join(JOINED_NAME);
    runner.run_checked("ffmpeg", request.ffmpeg, concat_args(&list_path, &joined, &plan))?;

    Ok(PreparedAudio::new(joined, OutputCodec::Lpcm, durations))
}
