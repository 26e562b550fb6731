//! Disc image creation and burning.
//!
//! A thin wrapper around the platform tools. Nothing is run unless the
//! disc folder passes the capacity preflight.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::capacity::preflight;
use crate::error::{BuildError, BuildResult};
use crate::models::DiscCapacity;
use crate::process::ProcessRunner;

/// Volume label written into the image.
pub const VOLUME_LABEL: &str = "BDMV";

/// Burner device used when none is given (non-macOS).
pub const DEFAULT_DEVICE: &str = "/dev/sr0";

/// Imaging/burning tool family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurnPlatform {
    /// `hdiutil` + `drutil`.
    MacOs,
    /// `genisoimage` + `growisofs`.
    Unix,
}

impl BurnPlatform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            BurnPlatform::MacOs
        } else {
            BurnPlatform::Unix
        }
    }

    fn image_extension(&self) -> &'static str {
        match self {
            BurnPlatform::MacOs => "dmg",
            BurnPlatform::Unix => "iso",
        }
    }
}

/// One external command of a burn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnCommand {
    pub program: &'static str,
    pub args: Vec<OsString>,
}

impl BurnCommand {
    fn new(program: &'static str, args: Vec<OsString>) -> Self {
        Self { program, args }
    }
}

/// Burn options.
#[derive(Debug, Clone)]
pub struct BurnRequest {
    pub disc_dir: PathBuf,
    pub capacity: DiscCapacity,
    /// Burner device (ignored on macOS, where `drutil` picks the drive).
    pub device: Option<String>,
    /// Where to write the image. Defaults to a sibling of the disc folder.
    pub image: Option<PathBuf>,
    pub platform: BurnPlatform,
}

impl BurnRequest {
    pub fn new(disc_dir: impl Into<PathBuf>, capacity: DiscCapacity) -> Self {
        Self {
            disc_dir: disc_dir.into(),
            capacity,
            device: None,
            image: None,
            platform: BurnPlatform::current(),
        }
    }

    /// Image path: the configured one, else `<disc_dir>.<ext>`.
    pub fn image_path(&self) -> PathBuf {
        self.image
            .clone()
            .unwrap_or_else(|| self.disc_dir.with_extension(self.platform.image_extension()))
    }
}

/// Command that builds a UDF image of the disc folder.
pub fn image_command(platform: BurnPlatform, disc_dir: &Path, image: &Path) -> BurnCommand {
    let mut args: Vec<OsString> = match platform {
        BurnPlatform::MacOs => ["makehybrid", "-udf", "-udf-volume-name", VOLUME_LABEL, "-o"]
            .map(OsString::from)
            .to_vec(),
        BurnPlatform::Unix => ["-udf", "-V", VOLUME_LABEL, "-o"]
            .map(OsString::from)
            .to_vec(),
    };
    args.push(image.as_os_str().to_os_string());
    args.push(disc_dir.as_os_str().to_os_string());

    let program = match platform {
        BurnPlatform::MacOs => "hdiutil",
        BurnPlatform::Unix => "genisoimage",
    };
    BurnCommand::new(program, args)
}

/// Command that writes the image to a disc.
pub fn burn_command(platform: BurnPlatform, image: &Path, device: Option<&str>) -> BurnCommand {
    match platform {
        BurnPlatform::MacOs => BurnCommand::new(
            "drutil",
            vec![OsString::from("burn"), image.as_os_str().to_os_string()],
        ),
        BurnPlatform::Unix => {
            let mut target = OsString::from(device.unwrap_or(DEFAULT_DEVICE));
            target.push("=");
            target.push(image.as_os_str());
            BurnCommand::new(
                "growisofs",
                vec![OsString::from("-dvd-compat"), OsString::from("-Z"), target],
            )
        }
    }
}

/// Check capacity, build the image, burn it. Returns the image path.
///
/// An oversized folder fails with `CapacityExceeded` before any tool runs.
pub fn burn_disc(request: &BurnRequest, runner: &ProcessRunner) -> BuildResult<PathBuf> {
    if !request.disc_dir.join("BDMV").is_dir() {
        return Err(BuildError::custom(format!(
            "{} is not a disc folder (no BDMV directory)",
            request.disc_dir.display()
        )));
    }

    let size = preflight(&request.disc_dir, request.capacity)?;
    tracing::info!(
        "Disc folder is {} bytes, {} budget is {} bytes",
        size,
        request.capacity,
        request.capacity.bytes()
    );

    let image = request.image_path();
    let commands = [
        image_command(request.platform, &request.disc_dir, &image),
        burn_command(request.platform, &image, request.device.as_deref()),
    ];
    for command in &commands {
        runner.run_checked(command.program, Path::new(command.program), &command.args)?;
    }

    Ok(image)
}
