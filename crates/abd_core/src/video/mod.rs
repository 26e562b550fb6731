//! Video synthesis.
//!
//! The disc needs a video stream, so one is generated for the whole
//! program:
//! - black screen: one lavfi colour source of the total duration, with
//!   optional timed text overlays
//! - custom frames: one rendered still per track, encoded to a segment of
//!   the track's duration, then stream-copied into one stream
//!
//! Both produce raw H.264 (`video.h264`).

pub mod color;
pub mod encode;
pub mod frame;
pub mod overlay;
pub mod tags;

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::concat_list;
use crate::config::FrameSettings;
use crate::error::{BuildError, BuildResult};
use crate::models::{AudioItem, VideoMode};
use crate::process::ProcessRunner;

pub use encode::{ffmpeg_rate, format_fps, format_seconds, x264_args, KEYFRAME_INTERVAL};
pub use frame::{load_font, FrameRenderer};
pub use overlay::{drawtext_chain, escape_drawtext, TextOverlay, MAX_GLOW_WIDTH, MAX_OVERLAYS};
pub use tags::{find_sidecar_cover, read_track_metadata};

/// Name of the final stream inside the work directory.
pub const VIDEO_NAME: &str = "video.h264";

/// Inputs of the video stage.
#[derive(Debug, Clone, Copy)]
pub struct VideoRequest<'a> {
    pub mode: VideoMode,
    /// Tracks in disc order (custom-frame mode reads their tags).
    pub items: &'a [AudioItem],
    /// Segment durations matching `items`.
    pub durations: &'a [f64],
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub frame: &'a FrameSettings,
    /// Overlays for black-screen mode.
    pub overlays: &'a [TextOverlay],
    pub work_dir: &'a Path,
    pub ffmpeg: &'a Path,
}

impl VideoRequest<'_> {
    pub fn total_duration(&self) -> f64 {
        self.durations.iter().sum()
    }
}

/// Generate the video stream.
///
/// `on_progress(fraction, message)` reports progress within this stage.
pub fn synthesize_video(
    request: &VideoRequest<'_>,
    runner: &ProcessRunner,
    on_progress: &dyn Fn(f64, &str),
) -> BuildResult<PathBuf> {
    if request.durations.is_empty() {
        return Err(BuildError::NoItems);
    }
    fs::create_dir_all(request.work_dir)
        .map_err(|e| BuildError::io("creating video work directory", e))?;

    match request.mode {
        VideoMode::BlackScreen => black_screen(request, runner, on_progress),
        VideoMode::CustomFrames => custom_frames(request, runner, on_progress),
    }
}

/// Arguments for the black clip.
pub fn black_screen_args(request: &VideoRequest<'_>, output: &Path) -> Vec<OsString> {
    let source = format!(
        "color=c=black:s={}x{}:r={}:d={}",
        request.width,
        request.height,
        ffmpeg_rate(request.fps),
        format_seconds(request.total_duration())
    );
    let mut args: Vec<OsString> = ["-y", "-hide_banner", "-f", "lavfi", "-i"]
        .map(OsString::from)
        .to_vec();
    args.push(source.into());
    if let Some(chain) = drawtext_chain(request.overlays) {
        args.push("-vf".into());
        args.push(chain.into());
    }
    args.extend(x264_args(request.fps));
    args.extend(["-an", "-f", "h264"].map(OsString::from));
    args.push(output.as_os_str().to_os_string());
    args
}

fn black_screen(
    request: &VideoRequest<'_>,
    runner: &ProcessRunner,
    on_progress: &dyn Fn(f64, &str),
) -> BuildResult<PathBuf> {
    let output = request.work_dir.join(VIDEO_NAME);
    on_progress(0.0, "Generating black video");
    runner.run_checked("ffmpeg", request.ffmpeg, black_screen_args(request, &output))?;
    on_progress(1.0, "Black video ready");
    Ok(output)
}

/// Arguments to encode one still into a segment.
pub fn still_segment_args(
    image: &Path,
    duration: f64,
    fps: f64,
    output: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-hide_banner", "-loop", "1", "-framerate"]
        .map(OsString::from)
        .to_vec();
    args.push(ffmpeg_rate(fps).into());
    args.push("-i".into());
    args.push(image.as_os_str().to_os_string());
    args.push("-t".into());
    args.push(format_seconds(duration).into());
    args.extend(x264_args(fps));
    args.push("-an".into());
    args.push(output.as_os_str().to_os_string());
    args
}

/// Arguments to stream-copy segments into one raw H.264 stream.
pub fn segment_concat_args(list: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-hide_banner", "-f", "concat", "-safe", "0", "-i"]
        .map(OsString::from)
        .to_vec();
    args.push(list.as_os_str().to_os_string());
    args.extend(["-c", "copy", "-bsf:v", "h264_mp4toannexb", "-f", "h264"].map(OsString::from));
    args.push(output.as_os_str().to_os_string());
    args
}

fn custom_frames(
    request: &VideoRequest<'_>,
    runner: &ProcessRunner,
    on_progress: &dyn Fn(f64, &str),
) -> BuildResult<PathBuf> {
    let font = load_font(&request.frame.font_path);
    if font.is_none() {
        tracing::warn!("No usable font found; frames are rendered without text");
    }
    let renderer = FrameRenderer::new(request.frame, request.width, request.height, font);

    let total = request.durations.len();
    let steps = (2 * total + 1) as f64;
    let mut done = 0.0;
    let mut segments = Vec::with_capacity(total);

    for (index, duration) in request.durations.iter().enumerate() {
        runner.cancel_token().check()?;
        let number = index + 1;

        let (metadata, sidecar) = match request.items.get(index) {
            Some(item) => (
                read_track_metadata(&item.path, number),
                find_sidecar_cover(&item.path),
            ),
            None => (crate::models::TrackMetadata::placeholder(number), None),
        };
        let cover = renderer.choose_cover(&metadata, sidecar.as_deref());
        let frame = renderer.render(&metadata, cover.as_ref());

        let image_path = request.work_dir.join(format!("frame_{:03}.png", number));
        frame.save(&image_path).map_err(|e| {
            BuildError::custom(format!("Failed to create frame for track {}: {}", number, e))
        })?;
        done += 1.0;
        on_progress(done / steps, &format!("Frame {}/{}", number, total));

        let segment = request.work_dir.join(format!("segment_{:03}.mp4", number));
        runner.run_checked(
            "ffmpeg",
            request.ffmpeg,
            still_segment_args(&image_path, *duration, request.fps, &segment),
        )?;
        segments.push(segment);
        done += 1.0;
        on_progress(done / steps, &format!("Encoded {}/{}", number, total));
    }

    runner.cancel_token().check()?;
    let list_path = request.work_dir.join("concat_video.txt");
    fs::write(&list_path, concat_list(&segments))
        .map_err(|e| BuildError::io("writing video concat list", e))?;

    let output = request.work_dir.join(VIDEO_NAME);
    on_progress(done / steps, "Joining video segments");
    runner.run_checked("ffmpeg", request.ffmpeg, segment_concat_args(&list_path, &output))?;
    on_progress(1.0, "Video ready");
    Ok(output)
}
