//! Locating and validating the external tools.
//!
//! Three tools are needed: ffprobe (metadata), ffmpeg (transcoding and
//! video synthesis) and tsMuxeR (Blu-ray multiplexing).

mod resolver;
mod validate;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use resolver::{is_executable, ToolResolver};
pub use validate::validate_tool;

use crate::config::{ConfigManager, ConfigResult};

/// External tools used by a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Ffmpeg,
    Ffprobe,
    TsMuxer,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Ffmpeg, Tool::Ffprobe, Tool::TsMuxer];

    /// Name used in messages and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::Ffprobe => "ffprobe",
            Tool::TsMuxer => "tsMuxeR",
        }
    }

    /// Key of the preferred path in the `[tools]` settings section.
    pub fn config_key(&self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::Ffprobe => "ffprobe",
            Tool::TsMuxer => "tsmuxer",
        }
    }

    /// Executable file names to look for.
    pub fn binary_names(&self) -> &'static [&'static str] {
        match self {
            Tool::Ffmpeg => &["ffmpeg"],
            Tool::Ffprobe => &["ffprobe"],
            Tool::TsMuxer => &["tsMuxeR", "tsmuxer"],
        }
    }

    /// Arguments of the validation invocation.
    ///
    /// tsMuxeR has no version flag; a bare run prints its banner.
    pub fn validation_args(&self) -> &'static [&'static str] {
        match self {
            Tool::Ffmpeg | Tool::Ffprobe => &["-version"],
            Tool::TsMuxer => &[],
        }
    }

    /// Exit codes accepted from the validation invocation.
    pub fn benign_exit_codes(&self) -> &'static [i32] {
        match self {
            Tool::Ffmpeg | Tool::Ffprobe => &[0],
            Tool::TsMuxer => &[0, 1],
        }
    }

    /// Text that identifies the tool in its validation output.
    pub fn identifier(&self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg version",
            Tool::Ffprobe => "ffprobe version",
            Tool::TsMuxer => "tsMuxeR",
        }
    }

    /// Built-in fallback candidates, tried after configured ones.
    pub fn builtin_candidates(&self) -> &'static [&'static str] {
        match self {
            Tool::Ffmpeg => &[
                "@exe/ffmpeg",
                "@exe/tools/ffmpeg",
                "/opt/homebrew/bin/ffmpeg",
                "/usr/local/bin/ffmpeg",
                "/usr/bin/ffmpeg",
                "~/bin/ffmpeg",
                "ffmpeg",
            ],
            Tool::Ffprobe => &[
                "@exe/ffprobe",
                "@exe/tools/ffprobe",
                "/opt/homebrew/bin/ffprobe",
                "/usr/local/bin/ffprobe",
                "/usr/bin/ffprobe",
                "~/bin/ffprobe",
                "ffprobe",
            ],
            Tool::TsMuxer => &[
                "@exe/tsMuxeR",
                "@exe/tools/tsMuxeR",
                "/Applications/tsMuxerGUI.app",
                "/Applications/tsMuxeR.app",
                "/opt/homebrew/bin/tsMuxeR",
                "/usr/local/bin/tsMuxeR",
                "/usr/bin/tsMuxeR",
                "~/bin/tsMuxeR",
                "tsMuxeR",
                "tsmuxer",
            ],
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Validated tool locations for one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTools {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub tsmuxer: PathBuf,
}

impl ResolvedTools {
    pub fn path(&self, tool: Tool) -> &PathBuf {
        match tool {
            Tool::Ffmpeg => &self.ffmpeg,
            Tool::Ffprobe => &self.ffprobe,
            Tool::TsMuxer => &self.tsmuxer,
        }
    }

    /// Directories holding the tools, for the augmented search path.
    pub fn dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        for tool in Tool::ALL {
            if let Some(parent) = self.path(tool).parent() {
                let parent = parent.to_path_buf();
                if !parent.as_os_str().is_empty() && !dirs.contains(&parent) {
                    dirs.push(parent);
                }
            }
        }
        dirs
    }
}

/// Remember resolved paths in the `[tools]` section.
///
/// Returns how many entries changed.
pub fn persist_tools(config: &mut ConfigManager, tools: &ResolvedTools) -> ConfigResult<usize> {
    config.remember_tool_paths(&[
        (Tool::Ffmpeg, tools.ffmpeg.as_path()),
        (Tool::Ffprobe, tools.ffprobe.as_path()),
        (Tool::TsMuxer, tools.tsmuxer.as_path()),
    ])
}
