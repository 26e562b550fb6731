//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::models::{BackgroundMode, DiscCapacity, LpcmFormat, OutputCodec, VideoMode};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// External tool locations.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Build choices (codec, format, disc, video).
    #[serde(default)]
    pub build: BuildSettings,

    /// Custom frame appearance.
    #[serde(default)]
    pub frame: FrameSettings,

    /// Size estimate heuristics.
    #[serde(default)]
    pub estimate: EstimateSettings,
}

/// Path configuration for output, temp, and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Default folder that receives `BDMV_OUT_*` folders.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Root folder for per-build workspaces.
    #[serde(default = "default_temp_root")]
    pub temp_root: String,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Last output folder chosen by the user.
    #[serde(default)]
    pub last_output_dir: String,
}

fn default_output_folder() -> String {
    "bluray_output".to_string()
}

fn default_temp_root() -> String {
    ".temp".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
            temp_root: default_temp_root(),
            logs_folder: default_logs_folder(),
            last_output_dir: String::new(),
        }
    }
}

/// Preferred paths and extra candidates for the external tools.
///
/// Empty preferred paths mean "use the candidate list only".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default)]
    pub ffmpeg: String,

    #[serde(default)]
    pub ffprobe: String,

    #[serde(default)]
    pub tsmuxer: String,

    /// Extra candidates tried before the built-in fallback list.
    #[serde(default)]
    pub extra_candidates: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Use compact log format (tool output only kept in the tail buffer).
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool output lines shown after a failure.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Write the tsMuxeR descriptor into the build log.
    #[serde(default = "default_true")]
    pub show_descriptor: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    10
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            show_descriptor: true,
        }
    }
}

/// Build choices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Audio format written to the disc.
    #[serde(default)]
    pub codec: OutputCodec,

    /// LPCM target. `None` matches the sources when they agree.
    #[serde(default)]
    pub lpcm_format: Option<LpcmFormat>,

    /// Disc size budget.
    #[serde(default)]
    pub disc_capacity: DiscCapacity,

    /// Video frame rate (e.g. 23.976, 24, 25, 29.97).
    #[serde(default = "default_fps")]
    pub fps: f64,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// Black screen or rendered per-track frames.
    #[serde(default)]
    pub video_mode: VideoMode,

    /// Keep the build workspace after a successful build.
    #[serde(default)]
    pub keep_workspace: bool,
}

fn default_fps() -> f64 {
    23.976
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            codec: OutputCodec::default(),
            lpcm_format: None,
            disc_capacity: DiscCapacity::default(),
            fps: default_fps(),
            width: default_width(),
            height: default_height(),
            video_mode: VideoMode::default(),
            keep_workspace: false,
        }
    }
}

/// Appearance of rendered per-track frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSettings {
    #[serde(default)]
    pub background: BackgroundMode,

    /// Solid colour, and gradient top colour.
    #[serde(default = "default_background_color")]
    pub background_color: String,

    /// Gradient bottom colour.
    #[serde(default = "default_gradient_color")]
    pub gradient_color: String,

    /// Image used when `background = "image"`.
    #[serde(default)]
    pub background_image: String,

    /// Cover used when a track has neither embedded nor sidecar art.
    #[serde(default)]
    pub fallback_cover: String,

    #[serde(default = "default_true")]
    pub show_cover: bool,

    #[serde(default = "default_cover_border")]
    pub cover_border: u32,

    #[serde(default = "default_text_color")]
    pub text_color: String,

    #[serde(default = "default_true")]
    pub show_artist: bool,

    #[serde(default = "default_true")]
    pub show_album: bool,

    #[serde(default)]
    pub glow: bool,

    #[serde(default = "default_glow_color")]
    pub glow_color: String,

    /// Glow strength, 0.0 - 1.0.
    #[serde(default = "default_glow_intensity")]
    pub glow_intensity: f32,

    /// TrueType/OpenType font. Empty means search system fonts.
    #[serde(default)]
    pub font_path: String,
}

fn default_background_color() -> String {
    "#101018".to_string()
}

fn default_gradient_color() -> String {
    "#000000".to_string()
}

fn default_text_color() -> String {
    "#FFFFFF".to_string()
}

fn default_glow_color() -> String {
    "#6FA8FF".to_string()
}

fn default_cover_border() -> u32 {
    6
}

fn default_glow_intensity() -> f32 {
    0.6
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            background: BackgroundMode::default(),
            background_color: default_background_color(),
            gradient_color: default_gradient_color(),
            background_image: String::new(),
            fallback_cover: String::new(),
            show_cover: true,
            cover_border: default_cover_border(),
            text_color: default_text_color(),
            show_artist: true,
            show_album: true,
            glow: false,
            glow_color: default_glow_color(),
            glow_intensity: default_glow_intensity(),
            font_path: String::new(),
        }
    }
}

/// Heuristic constants for the size estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateSettings {
    /// Video bitrate assumed before the real video exists (bits/s).
    #[serde(default = "default_video_bitrate")]
    pub video_bitrate_bps: u64,

    /// Container/multiplexing overhead factor (0.06 = 6%).
    #[serde(default = "default_mux_overhead")]
    pub mux_overhead: f64,
}

fn default_video_bitrate() -> u64 {
    500_000
}

fn default_mux_overhead() -> f64 {
    0.06
}

impl Default for EstimateSettings {
    fn default() -> Self {
        Self {
            video_bitrate_bps: default_video_bitrate(),
            mux_overhead: default_mux_overhead(),
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Tools,
    Logging,
    Build,
    Frame,
    Estimate,
}

impl ConfigSection {
    /// All sections in file order.
    pub const ALL: [ConfigSection; 6] = [
        ConfigSection::Paths,
        ConfigSection::Tools,
        ConfigSection::Logging,
        ConfigSection::Build,
        ConfigSection::Frame,
        ConfigSection::Estimate,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Tools => "tools",
            ConfigSection::Logging => "logging",
            ConfigSection::Build => "build",
            ConfigSection::Frame => "frame",
            ConfigSection::Estimate => "estimate",
        }
    }

    /// Comment written above the section in a fresh config file.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "# Output, workspace and log directories",
            ConfigSection::Tools => "# External tools (ffmpeg, ffprobe, tsMuxeR)",
            ConfigSection::Logging => "# Logging configuration",
            ConfigSection::Build => "# Disc build choices",
            ConfigSection::Frame => "# Rendered per-track frame appearance",
            ConfigSection::Estimate => "# Output size estimate heuristics",
        }
    }
}
