//! Running tsMuxeR and finishing the disc folder.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::{BuildError, BuildResult};
use crate::process::ProcessRunner;

/// Prefix of every produced disc folder.
pub const OUTPUT_PREFIX: &str = "BDMV_OUT_";

/// `BDMV_OUT_<YYYYmmdd_HHMMSS>` for a point in time.
pub fn output_folder_name(at: DateTime<Local>) -> String {
    format!("{}{}", OUTPUT_PREFIX, at.format("%Y%m%d_%H%M%S"))
}

/// Create a fresh, timestamped output folder under `output_root`.
///
/// A numeric suffix is added if a folder with this second's timestamp
/// already exists.
pub fn create_output_folder(output_root: &Path, at: DateTime<Local>) -> BuildResult<PathBuf> {
    fs::create_dir_all(output_root)
        .map_err(|e| BuildError::io("creating output directory", e))?;

    let base = output_folder_name(at);
    let mut candidate = output_root.join(&base);
    let mut suffix = 1;
    while candidate.exists() {
        candidate = output_root.join(format!("{}_{}", base, suffix));
        suffix += 1;
    }

    fs::create_dir(&candidate).map_err(|e| BuildError::io("creating disc folder", e))?;
    Ok(candidate)
}

/// Run tsMuxeR on a descriptor into `disc_dir`.
///
/// A non-zero exit fails with the combined tool output.
pub fn run_tsmuxer(
    runner: &ProcessRunner,
    tsmuxer: &Path,
    descriptor: &Path,
    disc_dir: &Path,
) -> BuildResult<()> {
    runner.run_checked("tsMuxeR", tsmuxer, [descriptor.as_os_str(), disc_dir.as_os_str()])?;
    Ok(())
}

/// Make sure `CERTIFICATE/` exists beside `BDMV/`.
pub fn ensure_certificate_dir(disc_dir: &Path) -> BuildResult<PathBuf> {
    let certificate = disc_dir.join("CERTIFICATE");
    if !certificate.is_dir() {
        fs::create_dir_all(&certificate)
            .map_err(|e| BuildError::io("creating CERTIFICATE directory", e))?;
    }
    Ok(certificate)
}
