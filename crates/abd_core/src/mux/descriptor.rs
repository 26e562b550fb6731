//! tsMuxeR `.meta` descriptor rendering.
//!
//! The multiplexer is strict about this file: field order, the `, `
//! separators and the option spellings below must not change.

use std::fs;
use std::path::{Path, PathBuf};

use crate::chapters::{format_hms, parse_chapter_file, ChapterMark};
use crate::error::{BuildError, BuildResult};
use crate::models::{extension_of, OutputCodec, PreparedAudio};
use crate::video::format_fps;

/// Name of the descriptor inside the work directory.
pub const DESCRIPTOR_NAME: &str = "disc.meta";

/// Global options line prefix.
const MUXOPT: &str = "MUXOPT --blu-ray --vbr 20000 --auto-chapters=0";

/// Video codec token (H.264).
const VIDEO_TOKEN: &str = "V_MPEG4/ISO/AVC";

/// Extensions of container formats, which need an explicit `track=1`.
///
/// Everything else is treated as a raw elementary stream.
const CONTAINER_EXTENSIONS: &[&str] = &[
    "mkv", "mka", "mk3d", "mp4", "m4v", "m4a", "mov", "m2ts", "mts", "ts", "avi",
];

/// Whether a path names a container rather than a raw elementary stream.
pub fn is_container_path(path: &Path) -> bool {
    let ext = extension_of(path);
    CONTAINER_EXTENSIONS.contains(&ext.as_str())
}

/// Everything the descriptor references.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorInput {
    pub video: PathBuf,
    pub audio: PathBuf,
    pub codec: OutputCodec,
    pub fps: f64,
    /// Chapter starts in whole seconds.
    pub chapter_secs: Vec<u64>,
}

impl DescriptorInput {
    /// Descriptor input for a prepared audio stream and its chapter marks.
    pub fn new(
        video: impl Into<PathBuf>,
        audio: &PreparedAudio,
        fps: f64,
        chapters: &[ChapterMark],
    ) -> Self {
        Self {
            video: video.into(),
            audio: audio.path.clone(),
            codec: audio.codec,
            fps,
            chapter_secs: chapters.iter().map(ChapterMark::start_secs_rounded).collect(),
        }
    }
}

/// Render the descriptor text.
pub fn render_descriptor(input: &DescriptorInput) -> String {
    let chapters = input
        .chapter_secs
        .iter()
        .map(|secs| format_hms(*secs))
        .collect::<Vec<_>>()
        .join(";");

    let mut video = format!("{}, {}", VIDEO_TOKEN, quote_path(&input.video));
    if is_container_path(&input.video) {
        video.push_str(", track=1");
    }
    video.push_str(&format!(", fps={}, level=4.1", format_fps(input.fps)));

    let mut audio = format!("{}, {}", input.codec.mux_token(), quote_path(&input.audio));
    if input.codec == OutputCodec::Lpcm {
        audio.push_str(", bitDepth=24");
    }
    if is_container_path(&input.audio) {
        audio.push_str(", track=1");
    }
    audio.push_str(", lang=eng");

    format!("{MUXOPT} --custom-chapters={chapters}\n{video}\n{audio}\n")
}

/// Build the descriptor from the chapter file on disk and write it.
///
/// Chapter starts are re-read from `chapter_file` so the descriptor always
/// matches what the chapter stage wrote.
pub fn write_descriptor(
    path: &Path,
    video: &Path,
    audio: &PreparedAudio,
    fps: f64,
    chapter_file: &Path,
) -> BuildResult<String> {
    let marks = parse_chapter_file(chapter_file)?;
    let text = render_descriptor(&DescriptorInput::new(video, audio, fps, &marks));
    fs::write(path, &text).map_err(|e| BuildError::io("writing mux descriptor", e))?;
    Ok(text)
}

/// Paths are always wrapped in double quotes, even where the bare line
/// grammar shows them unquoted, so folders with spaces or commas survive
/// tsMuxeR's comma-separated parsing.
fn quote_path(path: &Path) -> String {
    format!("\"{}\"", path.display())
}
