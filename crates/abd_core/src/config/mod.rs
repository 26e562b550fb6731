//! Configuration management for Audio Blu-ray Author.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Repair on open: missing sections appended, unknown ones dropped
//! - Per-key writes that keep the rest of the file as the user left it
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use abd_core::config::{default_config_path, ConfigManager};
//!
//! let mut config = ConfigManager::open(default_config_path()).unwrap();
//! println!("Output folder: {}", config.output_folder().display());
//!
//! config.remember_output_dir(Path::new("/media/discs")).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{default_config_path, ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    BuildSettings, ConfigSection, EstimateSettings, FrameSettings, LoggingSettings,
    PathSettings, Settings, ToolSettings,
};
