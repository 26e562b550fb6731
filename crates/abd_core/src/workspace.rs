//! Per-build working directory.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::{BuildError, BuildResult};

/// Directory owned by one build: `<temp_root>/build_<timestamp>`.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    /// Create a fresh workspace. A numeric suffix avoids reusing a folder
    /// from a build started in the same second.
    pub fn create(temp_root: &Path, at: DateTime<Local>) -> BuildResult<Self> {
        fs::create_dir_all(temp_root)
            .map_err(|e| BuildError::io("creating temp root", e))?;

        let base = format!("build_{}", at.format("%Y%m%d_%H%M%S"));
        let mut path = temp_root.join(&base);
        let mut suffix = 1;
        while path.exists() {
            path = temp_root.join(format!("{}_{}", base, suffix));
            suffix += 1;
        }

        fs::create_dir(&path).map_err(|e| BuildError::io("creating build workspace", e))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory name, used as the build name.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "build".to_string())
    }

    /// Remove the workspace. Failures are logged, not returned.
    pub fn remove(self) -> bool {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    "Could not remove workspace {}: {}",
                    self.path.display(),
                    e
                );
                false
            }
        }
    }
}
