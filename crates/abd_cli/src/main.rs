//! `audio-bluray`: build, estimate and burn audio-only Blu-ray discs.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use abd_core::burn::{burn_disc, BurnRequest};
use abd_core::capacity::{check_fits, CapacityEstimator};
use abd_core::config::{default_config_path, ConfigManager};
use abd_core::logging::{init_tracing, init_tracing_with_file, LogLevel};
use abd_core::models::{AudioItem, DiscCapacity, LpcmFormat, OutputCodec, TrackList, VideoMode};
use abd_core::orchestrator::{BuildRequest, BuildRunner};
use abd_core::probe::probe_items;
use abd_core::process::{CancelToken, ProcessRunner, ProcessSupervisor};
use abd_core::session::{BuildSession, BuildStatus};
use abd_core::tools::{persist_tools, Tool, ToolResolver};
use abd_core::video::TextOverlay;

#[derive(Parser, Debug)]
#[command(name = "audio-bluray")]
#[command(version)]
#[command(about = "Author audio-only Blu-ray folders with ffmpeg and tsMuxeR", long_about = None)]
struct Cli {
    /// Settings file (defaults to the platform config location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true, default_value = "info")]
    log_level: LogLevel,

    /// Shorthand for `--log-level debug`
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a BDMV folder from audio tracks, in the order given
    Build(BuildArgs),

    /// Probe audio files and print their attributes
    Probe {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Estimate the finished disc size before building
    Estimate {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        format: FormatArgs,
    },

    /// Write a disc image of a BDMV folder and burn it
    Burn {
        /// BDMV_OUT_* folder to burn
        disc_dir: PathBuf,

        /// Disc size to check against
        #[arg(long)]
        disc: Option<DiscCapacity>,

        /// Burner device
        #[arg(long)]
        device: Option<String>,

        /// Image file to write (default: next to the disc folder)
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Locate and validate ffmpeg, ffprobe and tsMuxeR, then save their paths
    Tools,
}

#[derive(clap::Args, Debug)]
struct FormatArgs {
    /// Output audio codec: lpcm, truehd, dtshd
    #[arg(long)]
    codec: Option<OutputCodec>,

    /// LPCM target: 48, 96 or 192 (default: match the sources)
    #[arg(long)]
    lpcm_format: Option<LpcmFormat>,

    /// Disc size: BD-25, BD-50 or BD-100
    #[arg(long)]
    disc: Option<DiscCapacity>,
}

#[derive(clap::Args, Debug)]
struct BuildArgs {
    /// Audio tracks in play order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    #[command(flatten)]
    format: FormatArgs,

    /// Video track style
    #[arg(long, value_enum)]
    video: Option<VideoArg>,

    /// Video frame rate
    #[arg(long)]
    fps: Option<f64>,

    /// Show each track name as a caption (black-screen video only)
    #[arg(long)]
    captions: bool,

    /// Folder that receives the BDMV_OUT_* folder
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep the build workspace after a successful build
    #[arg(long)]
    keep_workspace: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum VideoArg {
    Black,
    Frames,
}

impl From<VideoArg> for VideoMode {
    fn from(arg: VideoArg) -> Self {
        match arg {
            VideoArg::Black => VideoMode::BlackScreen,
            VideoArg::Frames => VideoMode::CustomFrames,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = ConfigManager::open(&config_path)
        .with_context(|| format!("Failed to load settings from {}", config_path.display()))?;
    config
        .ensure_dirs_exist()
        .context("Failed to create output, temp or log folders")?;

    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        cli.log_level
    };
    let _guard = match init_tracing_with_file(level, config.logs_folder()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            init_tracing(level);
            warn!("Logging to stderr only, log folder unusable: {}", e);
            None
        }
    };

    match cli.command {
        Command::Build(args) => build(&mut config, args).await,
        Command::Probe { files, json } => probe(&mut config, &files, json),
        Command::Estimate { files, format } => estimate(&mut config, &files, &format),
        Command::Burn {
            disc_dir,
            disc,
            device,
            image,
        } => burn(&config, disc_dir, disc, device, image),
        Command::Tools => tools(&mut config),
    }
}

/// Process runner for work outside a build.
fn standalone_runner() -> ProcessRunner {
    ProcessRunner::new(Arc::new(ProcessSupervisor::new()), CancelToken::new())
}

/// Resolve ffprobe, remember where it was found, and probe `files`.
fn import_tracks(config: &mut ConfigManager, files: &[PathBuf]) -> Result<TrackList> {
    for file in files {
        if !file.is_file() {
            bail!("Not a file: {}", file.display());
        }
    }

    let runner = standalone_runner();
    let tool_settings = config.settings().tools.clone();
    let resolver = ToolResolver::new(tool_settings.extra_candidates.clone());
    let ffprobe = resolver.resolve_validated(Tool::Ffprobe, &tool_settings.ffprobe, &runner)?;

    if let Err(e) = config.remember_tool_paths(&[(Tool::Ffprobe, ffprobe.as_path())]) {
        warn!("Could not save ffprobe location: {}", e);
    }

    Ok(probe_items(&runner, &ffprobe, files, None)
        .into_iter()
        .collect())
}

fn apply_format(config: &mut ConfigManager, format: &FormatArgs) {
    let build = &mut config.settings_mut().build;
    if let Some(codec) = format.codec {
        build.codec = codec;
    }
    if format.lpcm_format.is_some() {
        build.lpcm_format = format.lpcm_format;
    }
    if let Some(disc) = format.disc {
        build.disc_capacity = disc;
    }
}

/// One caption per track, timed on the running total of durations.
fn track_captions(items: &[AudioItem]) -> Vec<TextOverlay> {
    let mut start = 0.0;
    let mut overlays = Vec::new();
    for item in items {
        let Some(duration) = item.duration_secs() else {
            break;
        };
        overlays.push(TextOverlay::caption(
            item.display_name.clone(),
            start,
            start + duration,
        ));
        start += duration;
    }
    overlays
}

async fn build(config: &mut ConfigManager, args: BuildArgs) -> Result<()> {
    apply_format(config, &args.format);
    {
        let build = &mut config.settings_mut().build;
        if let Some(video) = args.video {
            build.video_mode = video.into();
        }
        if let Some(fps) = args.fps {
            build.fps = fps;
        }
        if args.keep_workspace {
            build.keep_workspace = true;
        }
    }

    let tracks = import_tracks(config, &args.files)?;
    let output_dir = args.output.clone().unwrap_or_else(|| config.output_folder());

    let mut request = BuildRequest::new(tracks.snapshot(), &output_dir);
    if args.captions {
        if config.settings().build.video_mode == VideoMode::BlackScreen {
            request.overlays = track_captions(&request.items);
        } else {
            warn!("--captions only applies to black-screen video; ignoring");
        }
    }

    let session = BuildSession::new();
    let runner = BuildRunner::new(config.settings().clone(), session.clone())
        .with_log_echo(|line| println!("{}", line));

    let mut worker = tokio::task::spawn_blocking(move || runner.run(request));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(Duration::from_secs(5));
    let mut cancel_sent = false;

    let report = loop {
        tokio::select! {
            joined = &mut worker => break joined.context("Build worker panicked")?,
            _ = &mut ctrl_c, if !cancel_sent => {
                cancel_sent = true;
                warn!("Cancelling build...");
                session.cancel();
            }
            _ = ticker.tick() => {
                let snapshot = session.snapshot();
                if snapshot.status == BuildStatus::Running {
                    let estimate = snapshot
                        .estimate
                        .map(|e| format!(" | {}", e))
                        .unwrap_or_default();
                    info!(
                        "{:>3.0}% {}{}",
                        snapshot.progress * 100.0,
                        snapshot.status_text,
                        estimate
                    );
                }
            }
        }
    };

    if let Some(tools) = &report.tools {
        if let Err(e) = persist_tools(config, tools) {
            warn!("Could not save tool locations: {}", e);
        }
    }

    if let Err(e) = config.remember_output_dir(&output_dir) {
        warn!("Could not save output folder: {}", e);
    }

    if let Some(log) = &report.log_path {
        info!("Build log: {}", log.display());
    }
    if let Some(workspace) = &report.kept_workspace {
        info!("Workspace kept at {}", workspace.display());
    }

    match report.outcome {
        Ok(disc_dir) => {
            println!("Disc folder: {}", disc_dir.display());
            if let Some(estimate) = report.estimate {
                println!("Size: {}", estimate);
            }
            Ok(())
        }
        Err(e) if e.is_cancelled() => bail!("Build cancelled"),
        Err(e) => Err(e).context("Build failed"),
    }
}

fn probe(config: &mut ConfigManager, files: &[PathBuf], json: bool) -> Result<()> {
    let tracks = import_tracks(config, files)?;

    if json {
        println!("{}", serde_json::to_string_pretty(tracks.items())?);
        return Ok(());
    }

    for item in tracks.items() {
        if !item.is_probed() {
            println!("{:<40} (no metadata)", item.display_name);
            continue;
        }
        let a = &item.attributes;
        println!(
            "{:<40} {:>10} {:>7} {:>4} {:>3}ch  {}",
            item.display_name,
            a.duration_secs
                .map(|d| format!("{:.3}s", d))
                .unwrap_or_else(|| "?".to_string()),
            a.sample_rate
                .map(|r| r.to_string())
                .unwrap_or_else(|| "?".to_string()),
            a.bit_depth
                .map(|b| b.to_string())
                .unwrap_or_else(|| "?".to_string()),
            a.channels
                .map(|c| c.to_string())
                .unwrap_or_else(|| "?".to_string()),
            a.codec_name.as_deref().unwrap_or("?"),
        );
    }
    println!(
        "{} track(s), {:.3}s total",
        tracks.len(),
        tracks.total_duration_secs()
    );
    Ok(())
}

fn estimate(config: &mut ConfigManager, files: &[PathBuf], format: &FormatArgs) -> Result<()> {
    apply_format(config, format);
    let tracks = import_tracks(config, files)?;
    let settings = config.settings();

    let estimator = CapacityEstimator::new(settings.estimate.clone());
    let estimate = estimator.pre_build(
        tracks.items(),
        settings.build.codec,
        settings.build.lpcm_format,
    );
    let capacity = settings.build.disc_capacity;

    println!("{} on {}: {}", settings.build.codec, capacity, estimate);
    match check_fits(estimate.bytes, capacity) {
        Ok(()) => println!("Fits on {}", capacity),
        Err(e) => println!("{}", e),
    }
    Ok(())
}

fn burn(
    config: &ConfigManager,
    disc_dir: PathBuf,
    disc: Option<DiscCapacity>,
    device: Option<String>,
    image: Option<PathBuf>,
) -> Result<()> {
    let capacity = disc.unwrap_or(config.settings().build.disc_capacity);
    let mut request = BurnRequest::new(&disc_dir, capacity);
    request.device = device;
    request.image = image;

    let image = burn_disc(&request, &standalone_runner())
        .with_context(|| format!("Failed to burn {}", disc_dir.display()))?;
    println!("Burned {} (image: {})", disc_dir.display(), image.display());
    Ok(())
}

fn tools(config: &mut ConfigManager) -> Result<()> {
    let runner = standalone_runner();
    let resolver = ToolResolver::new(config.settings().tools.extra_candidates.clone());
    let resolved = resolver.resolve_all(&config.settings().tools, &runner)?;

    for tool in Tool::ALL {
        println!("{:<8} {}", tool.name(), resolved.path(tool).display());
    }
    persist_tools(config, &resolved).context("Failed to save tool locations")?;
    println!("Saved to {}", config.path().display());
    Ok(())
}
