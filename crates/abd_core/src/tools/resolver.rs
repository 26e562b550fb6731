//! Candidate expansion and path resolution.

use std::fs;
use std::path::{Path, PathBuf};

use super::validate::validate_tool;
use super::{ResolvedTools, Tool};
use crate::config::ToolSettings;
use crate::error::{BuildError, BuildResult};
use crate::process::ProcessRunner;

/// Finds tool executables from a preferred path and candidate lists.
///
/// Candidate forms:
/// - absolute paths
/// - `~/...`, relative to the home directory
/// - `@exe/...`, relative to the directory of the running executable
/// - bare names, looked up on the search path
///
/// `.app` bundles are searched for their inner executable.
#[derive(Debug, Clone, Default)]
pub struct ToolResolver {
    extra_candidates: Vec<String>,
    home_dir: Option<PathBuf>,
    exe_dir: Option<PathBuf>,
}

impl ToolResolver {
    /// Resolver using the current user's home and executable directory.
    pub fn new(extra_candidates: Vec<String>) -> Self {
        let home_dir = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf());
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf));
        Self {
            extra_candidates,
            home_dir,
            exe_dir,
        }
    }

    /// Override the directories used for `~/` and `@exe/` candidates.
    pub fn with_dirs(mut self, home_dir: Option<PathBuf>, exe_dir: Option<PathBuf>) -> Self {
        self.home_dir = home_dir;
        self.exe_dir = exe_dir;
        self
    }

    /// Resolve and validate all three tools.
    pub fn resolve_all(
        &self,
        settings: &ToolSettings,
        runner: &ProcessRunner,
    ) -> BuildResult<ResolvedTools> {
        Ok(ResolvedTools {
            ffmpeg: self.resolve_validated(Tool::Ffmpeg, &settings.ffmpeg, runner)?,
            ffprobe: self.resolve_validated(Tool::Ffprobe, &settings.ffprobe, runner)?,
            tsmuxer: self.resolve_validated(Tool::TsMuxer, &settings.tsmuxer, runner)?,
        })
    }

    /// Resolve one tool and check that it runs.
    pub fn resolve_validated(
        &self,
        tool: Tool,
        preferred: &str,
        runner: &ProcessRunner,
    ) -> BuildResult<PathBuf> {
        let path = self
            .resolve(tool, preferred)
            .ok_or_else(|| BuildError::tool_missing(tool.name()))?;
        validate_tool(tool, &path, runner)?;
        tracing::info!("Using {} at {}", tool, path.display());
        Ok(path)
    }

    /// First executable candidate for `tool`, without validation.
    ///
    /// Order: preferred path, configured extra candidates matching the
    /// tool, then the built-in list.
    pub fn resolve(&self, tool: Tool, preferred: &str) -> Option<PathBuf> {
        let preferred = preferred.trim();
        let extras = self
            .extra_candidates
            .iter()
            .map(String::as_str)
            .filter(|c| candidate_matches(tool, c));

        std::iter::once(preferred)
            .filter(|p| !p.is_empty())
            .chain(extras)
            .chain(tool.builtin_candidates().iter().copied())
            .filter_map(|candidate| self.expand(candidate))
            .find_map(|path| probe_path(tool, &path))
    }

    /// Turn a candidate string into a concrete path.
    fn expand(&self, candidate: &str) -> Option<PathBuf> {
        if let Some(rest) = candidate.strip_prefix("~/") {
            return self.home_dir.as_ref().map(|home| home.join(rest));
        }
        if let Some(rest) = candidate.strip_prefix("@exe/") {
            return self.exe_dir.as_ref().map(|dir| dir.join(rest));
        }
        let path = Path::new(candidate);
        if path.is_absolute() || candidate.contains(std::path::MAIN_SEPARATOR) {
            return Some(path.to_path_buf());
        }
        which::which(candidate).ok()
    }
}

/// Whether an extra candidate string is meant for `tool`.
fn candidate_matches(tool: Tool, candidate: &str) -> bool {
    let file_name = Path::new(candidate)
        .file_stem()
        .map(|s| s.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    tool.binary_names()
        .iter()
        .any(|name| file_name == name.to_ascii_lowercase())
        || (tool == Tool::TsMuxer && file_name.contains("tsmuxer"))
}

/// Return an executable path for this candidate, if any.
fn probe_path(tool: Tool, path: &Path) -> Option<PathBuf> {
    if is_app_bundle(path) {
        return probe_bundle(tool, path);
    }
    if !path.is_file() {
        return None;
    }
    if is_executable(path) {
        return Some(path.to_path_buf());
    }
    tracing::debug!("{} is not executable, fixing permissions", path.display());
    make_executable(path);
    is_executable(path).then(|| path.to_path_buf())
}

fn is_app_bundle(path: &Path) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case("app")) && path.is_dir()
}

/// Look inside a `.app` bundle for the tool executable.
fn probe_bundle(tool: Tool, bundle: &Path) -> Option<PathBuf> {
    let macos = bundle.join("Contents").join("MacOS");
    let resources = bundle.join("Contents").join("Resources");

    let mut candidates = Vec::new();
    if let Some(stem) = bundle.file_stem() {
        candidates.push(macos.join(stem));
    }
    for name in tool.binary_names() {
        candidates.push(macos.join(name));
        candidates.push(resources.join(name));
    }

    for candidate in &candidates {
        if let Some(found) = probe_path(tool, candidate) {
            return Some(found);
        }
    }

    // Any executable in Contents/MacOS
    let mut entries: Vec<PathBuf> = fs::read_dir(&macos)
        .ok()?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    entries.sort();
    entries.into_iter().find(|p| is_executable(p))
}

/// Whether the file has any execute bit set.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Set execute bits and drop the download quarantine marker.
#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o755)) {
        tracing::warn!("Could not make {} executable: {}", path.display(), e);
    }
    #[cfg(target_os = "macos")]
    {
        let _ = std::process::Command::new("xattr")
            .arg("-d")
            .arg("com.apple.quarantine")
            .arg(path)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status();
    }
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}
