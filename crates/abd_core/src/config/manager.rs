//! Settings file handling.
//!
//! The file is opened once per run. Missing sections are appended and
//! unknown ones dropped, then individual keys are written back through
//! `toml_edit` so hand edits and comments elsewhere in the file survive.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item, Value};

use super::settings::{ConfigSection, Settings};
use crate::tools::Tool;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access settings file: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Settings file is not valid TOML: {0}")]
    Edit(#[from] toml_edit::TomlError),

    #[error("[{0}] in the settings file is not a table")]
    NotATable(&'static str),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Platform config location, e.g. `~/.config/audio-bluray/settings.toml`.
///
/// Falls back to `.config/settings.toml` in the working directory when no
/// home directory is known.
pub fn default_config_path() -> PathBuf {
    directories::ProjectDirs::from("io.github", "wingedonezero", "audio-bluray")
        .map(|dirs| dirs.config_dir().join("settings.toml"))
        .unwrap_or_else(|| PathBuf::from(".config").join("settings.toml"))
}

/// The settings file and its parsed contents.
///
/// `settings_mut` changes stay in memory. Only the `remember_*` methods
/// write, and they touch nothing but their own keys.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Load the settings file, creating it with defaults when absent.
    ///
    /// A file with missing or unknown sections is repaired and rewritten.
    pub fn open(config_path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let mut manager = Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        };

        if !manager.config_path.exists() {
            manager.atomic_write(&default_document(&manager.settings)?)?;
            tracing::info!(path = %manager.config_path.display(), "created default settings");
            return Ok(manager);
        }

        let content = fs::read_to_string(&manager.config_path)?;
        let (doc, repairs) = repair_document(&content)?;
        let text = doc.to_string();
        manager.settings = toml::from_str(&text)?;
        if !repairs.is_empty() {
            tracing::info!(
                path = %manager.config_path.display(),
                "repaired settings: {}",
                repairs.join(", ")
            );
            manager.atomic_write(&text)?;
        }
        Ok(manager)
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// In-memory overrides for this run, never written back.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Ensure output, temp and logs directories exist.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        let paths = &self.settings.paths;
        for dir in [&paths.output_folder, &paths.temp_root, &paths.logs_folder] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.logs_folder)
    }

    /// Output folder to use: the last chosen one, else the configured default.
    pub fn output_folder(&self) -> PathBuf {
        let paths = &self.settings.paths;
        if paths.last_output_dir.is_empty() {
            PathBuf::from(&paths.output_folder)
        } else {
            PathBuf::from(&paths.last_output_dir)
        }
    }

    /// Store `dir` as `paths.last_output_dir`.
    ///
    /// Returns false without touching the file when it is already stored.
    pub fn remember_output_dir(&mut self, dir: &Path) -> ConfigResult<bool> {
        let dir = dir.to_string_lossy().to_string();
        if self.settings.paths.last_output_dir == dir {
            return Ok(false);
        }
        self.write_keys(ConfigSection::Paths, &[("last_output_dir", dir.clone())])?;
        self.settings.paths.last_output_dir = dir;
        Ok(true)
    }

    /// Store resolved tool locations in `[tools]`.
    ///
    /// Only keys whose value changed are written; returns how many.
    pub fn remember_tool_paths(&mut self, found: &[(Tool, &Path)]) -> ConfigResult<usize> {
        let changed: Vec<(Tool, String)> = found
            .iter()
            .map(|(tool, path)| (*tool, path.to_string_lossy().to_string()))
            .filter(|(tool, path)| self.tool_setting(*tool) != path.as_str())
            .collect();
        if changed.is_empty() {
            return Ok(0);
        }

        let entries: Vec<(&str, String)> = changed
            .iter()
            .map(|(tool, path)| (tool.config_key(), path.clone()))
            .collect();
        self.write_keys(ConfigSection::Tools, &entries)?;

        for (tool, path) in &changed {
            *self.tool_setting_mut(*tool) = path.clone();
        }
        Ok(changed.len())
    }

    fn tool_setting(&self, tool: Tool) -> &str {
        let tools = &self.settings.tools;
        match tool {
            Tool::Ffmpeg => &tools.ffmpeg,
            Tool::Ffprobe => &tools.ffprobe,
            Tool::TsMuxer => &tools.tsmuxer,
        }
    }

    fn tool_setting_mut(&mut self, tool: Tool) -> &mut String {
        let tools = &mut self.settings.tools;
        match tool {
            Tool::Ffmpeg => &mut tools.ffmpeg,
            Tool::Ffprobe => &mut tools.ffprobe,
            Tool::TsMuxer => &mut tools.tsmuxer,
        }
    }

    /// Set string keys of one section in the on-disk document.
    ///
    /// The file is re-read first. Replaced values keep their surrounding
    /// comments and whitespace.
    fn write_keys(&self, section: ConfigSection, entries: &[(&str, String)]) -> ConfigResult<()> {
        let content = match fs::read_to_string(&self.config_path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        let mut doc: DocumentMut = content.parse()?;

        let name = section.table_name();
        let table = doc
            .entry(name)
            .or_insert_with(toml_edit::table)
            .as_table_like_mut()
            .ok_or(ConfigError::NotATable(name))?;

        for (key, text) in entries {
            let mut value = Value::from(text.as_str());
            if let Some(old) = table.get(key).and_then(Item::as_value) {
                *value.decor_mut() = old.decor().clone();
            }
            table.insert(key, Item::Value(value));
        }

        self.atomic_write(&doc.to_string())?;
        Ok(())
    }

    /// Replace the file through a temporary file in the same directory.
    fn atomic_write(&self, content: &str) -> ConfigResult<()> {
        let dir = match self.config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut file = tempfile::NamedTempFile::new_in(&dir)?;
        file.write_all(content.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.config_path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// One commented `[section]` block rendered from `settings`.
fn section_block(settings: &Settings, section: ConfigSection) -> ConfigResult<String> {
    let body = match section {
        ConfigSection::Paths => toml::to_string_pretty(&settings.paths)?,
        ConfigSection::Tools => toml::to_string_pretty(&settings.tools)?,
        ConfigSection::Logging => toml::to_string_pretty(&settings.logging)?,
        ConfigSection::Build => toml::to_string_pretty(&settings.build)?,
        ConfigSection::Frame => toml::to_string_pretty(&settings.frame)?,
        ConfigSection::Estimate => toml::to_string_pretty(&settings.estimate)?,
    };
    Ok(format!(
        "{}\n[{}]\n{}",
        section.comment(),
        section.table_name(),
        body.trim_end()
    ))
}

fn default_document(settings: &Settings) -> ConfigResult<String> {
    let mut out = String::from("# Audio Blu-ray Author settings\n");
    for section in ConfigSection::ALL {
        out.push('\n');
        out.push_str(&section_block(settings, section)?);
        out.push('\n');
    }
    Ok(out)
}

/// Append default blocks for missing sections and drop unknown tables.
///
/// Returns the repaired document and a description of each change.
fn repair_document(content: &str) -> ConfigResult<(DocumentMut, Vec<String>)> {
    let original: DocumentMut = content.parse()?;
    let defaults = Settings::default();
    let mut text = content.to_string();
    let mut repairs = Vec::new();

    for section in ConfigSection::ALL {
        if original.contains_key(section.table_name()) {
            continue;
        }
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push('\n');
        text.push_str(&section_block(&defaults, section)?);
        text.push('\n');
        repairs.push(format!("added [{}]", section.table_name()));
    }

    let mut doc: DocumentMut = text.parse()?;
    let unknown: Vec<String> = doc
        .iter()
        .map(|(key, _)| key.to_string())
        .filter(|key| !ConfigSection::ALL.iter().any(|s| s.table_name() == key))
        .collect();
    for key in unknown {
        doc.remove(&key);
        repairs.push(format!("dropped [{key}]"));
    }

    Ok((doc, repairs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OutputCodec;
    use tempfile::tempdir;

    #[test]
    fn open_creates_commented_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".config").join("settings.toml");

        let manager = ConfigManager::open(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Audio Blu-ray Author settings\n"));
        assert!(content.contains("# External tools (ffmpeg, ffprobe, tsMuxeR)\n[tools]\n"));
        assert!(content.contains("[estimate]"));
        assert_eq!(manager.settings().build.codec, OutputCodec::Lpcm);

        // Reopening a complete file does not rewrite it
        ConfigManager::open(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }

    #[test]
    fn open_repairs_sections_and_keeps_user_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            "# my discs\n[paths]\noutput_folder = \"/discs\" # NAS\n\n[gui]\ntheme = \"dark\"\n",
        )
        .unwrap();

        let manager = ConfigManager::open(&path).unwrap();
        assert_eq!(manager.settings().paths.output_folder, "/discs");

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# my discs\n[paths]\noutput_folder = \"/discs\" # NAS\n"));
        assert!(!content.contains("[gui]"));
        assert!(content.contains("# Disc build choices\n[build]\n"));
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[paths\n").unwrap();

        assert!(matches!(ConfigManager::open(&path), Err(ConfigError::Edit(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), "[paths\n");
    }

    #[test]
    fn remembering_output_dir_touches_only_that_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut manager = ConfigManager::open(&path).unwrap();

        let edited = fs::read_to_string(&path)
            .unwrap()
            .replace("last_output_dir = \"\"", "last_output_dir = \"\" # set by builds")
            .replace("codec = \"lpcm\"", "codec = \"truehd\"");
        fs::write(&path, &edited).unwrap();

        // In-memory overrides are not written back
        manager.settings_mut().build.codec = OutputCodec::DtsHd;
        assert!(manager.remember_output_dir(Path::new("/media/out")).unwrap());
        assert!(!manager.remember_output_dir(Path::new("/media/out")).unwrap());

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("last_output_dir = \"/media/out\" # set by builds\n"));
        assert!(content.contains("codec = \"truehd\""));
        assert_eq!(manager.output_folder(), PathBuf::from("/media/out"));
    }

    #[test]
    fn tool_paths_written_when_changed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut manager = ConfigManager::open(&path).unwrap();

        let edited = fs::read_to_string(&path)
            .unwrap()
            .replace("extra_candidates = []", "extra_candidates = [\"/opt/bin\"]");
        fs::write(&path, &edited).unwrap();

        let ffmpeg = Path::new("/opt/bin/ffmpeg");
        let tsmuxer = Path::new("/opt/ts/tsMuxeR");
        let written = manager
            .remember_tool_paths(&[(Tool::Ffmpeg, ffmpeg), (Tool::TsMuxer, tsmuxer)])
            .unwrap();
        assert_eq!(written, 2);
        assert_eq!(manager.settings().tools.tsmuxer, "/opt/ts/tsMuxeR");

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("ffmpeg = \"/opt/bin/ffmpeg\""));
        assert!(content.contains("tsmuxer = \"/opt/ts/tsMuxeR\""));
        assert!(content.contains("ffprobe = \"\""));
        assert!(content.contains("extra_candidates = [\"/opt/bin\"]"));

        assert_eq!(manager.remember_tool_paths(&[(Tool::Ffmpeg, ffmpeg)]).unwrap(), 0);
        let reopened = ConfigManager::open(&path).unwrap();
        assert_eq!(reopened.settings().tools.ffmpeg, "/opt/bin/ffmpeg");
        assert_eq!(reopened.settings().tools.extra_candidates, vec!["/opt/bin"]);
    }

    #[test]
    fn writes_leave_no_temporary_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut manager = ConfigManager::open(&path).unwrap();
        manager.remember_output_dir(Path::new("/out")).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("settings.toml")]);
    }

    #[test]
    fn output_folder_defaults_to_configured() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::open(dir.path().join("settings.toml")).unwrap();
        assert_eq!(manager.output_folder(), PathBuf::from("bluray_output"));
    }
}
