//! Build runner: one pipeline run wired to the session.
//!
//! Owns the per-build setup the steps rely on: the workspace, the build
//! logger, the process runner sharing the session's cancel token, and the
//! progress/estimate callbacks feeding the session.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;

use crate::capacity::SizeEstimate;
use crate::config::Settings;
use crate::error::BuildError;
use crate::logging::{BuildLogger, LogCallback, LogConfig};
use crate::models::AudioItem;
use crate::process::ProcessRunner;
use crate::session::BuildSession;
use crate::tools::{ResolvedTools, ToolResolver};
use crate::video::TextOverlay;
use crate::workspace::Workspace;

use super::errors::{PipelineError, PipelineResult};
use super::types::{BuildState, Context};
use super::create_standard_pipeline;

/// What to build.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Tracks in disc order.
    pub items: Vec<AudioItem>,
    /// Timed text for black-screen video.
    pub overlays: Vec<TextOverlay>,
    /// Folder that receives the `BDMV_OUT_*` folder.
    pub output_dir: PathBuf,
}

impl BuildRequest {
    pub fn new(items: Vec<AudioItem>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            items,
            overlays: Vec::new(),
            output_dir: output_dir.into(),
        }
    }
}

/// Result of one build.
#[derive(Debug)]
pub struct BuildReport {
    pub build_name: String,
    /// The disc folder, or why there is none.
    pub outcome: PipelineResult<PathBuf>,
    /// Tools resolved during the build (kept even if a later step failed).
    pub tools: Option<ResolvedTools>,
    pub estimate: Option<SizeEstimate>,
    pub steps_completed: Vec<String>,
    pub log_path: Option<PathBuf>,
    /// Workspace left on disk (failed builds, or `keep_workspace`).
    pub kept_workspace: Option<PathBuf>,
}

impl BuildReport {
    fn not_started(error: PipelineError) -> Self {
        Self {
            build_name: String::new(),
            outcome: Err(error),
            tools: None,
            estimate: None,
            steps_completed: Vec::new(),
            log_path: None,
            kept_workspace: None,
        }
    }

    pub fn disc_dir(&self) -> Option<&Path> {
        self.outcome.as_ref().ok().map(PathBuf::as_path)
    }
}

/// Runs builds against one session.
pub struct BuildRunner {
    settings: Settings,
    session: BuildSession,
    resolver: ToolResolver,
    log_echo: Option<Arc<dyn Fn(&str) + Send + Sync>>,
}

impl BuildRunner {
    pub fn new(settings: Settings, session: BuildSession) -> Self {
        let resolver = ToolResolver::new(settings.tools.extra_candidates.clone());
        Self {
            settings,
            session,
            resolver,
            log_echo: None,
        }
    }

    pub fn with_resolver(mut self, resolver: ToolResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Also send every build log line to `echo`.
    pub fn with_log_echo(mut self, echo: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.log_echo = Some(Arc::new(echo));
        self
    }

    pub fn session(&self) -> &BuildSession {
        &self.session
    }

    /// Run one build to completion.
    ///
    /// Rejected with `AlreadyRunning` while the session has a build in
    /// flight. The session ends in a succeeded, failed or cancelled state.
    pub fn run(&self, request: BuildRequest) -> BuildReport {
        if let Err(e) = self.session.begin() {
            return BuildReport::not_started(e);
        }

        let paths = &self.settings.paths;
        let workspace = match Workspace::create(Path::new(&paths.temp_root), Local::now()) {
            Ok(ws) => ws,
            Err(e) => {
                return self.setup_failed(String::new(), format!("Failed to create workspace: {}", e));
            }
        };
        let build_name = workspace.name();

        let logger = match BuildLogger::new(
            &build_name,
            &paths.logs_folder,
            LogConfig::from(&self.settings.logging),
            Some(self.log_callback()),
        ) {
            Ok(l) => Arc::new(l),
            Err(e) => {
                workspace.remove();
                return self.setup_failed(build_name, format!("Failed to create logger: {}", e));
            }
        };

        let runner = ProcessRunner::new(
            Arc::clone(self.session.supervisor()),
            self.session.cancel_token(),
        )
        .with_logger(Arc::clone(&logger));

        let progress_session = self.session.clone();
        let estimate_session = self.session.clone();
        let track_count = request.items.len();
        let ctx = Context::new(
            &build_name,
            self.settings.clone(),
            request.items,
            workspace.path().to_path_buf(),
            request.output_dir,
            Arc::clone(&logger),
            runner,
        )
        .with_overlays(request.overlays)
        .with_progress_callback(Box::new(move |fraction, message| {
            progress_session.set_progress(fraction, message);
        }))
        .with_estimate_callback(Box::new(move |estimate| {
            estimate_session.set_estimate(estimate);
        }));

        logger.info(&format!("Starting build: {}", build_name));
        logger.info(&format!(
            "{} track(s), {}, {} {}x{} @ {} fps",
            track_count,
            self.settings.build.codec,
            self.settings.build.disc_capacity,
            self.settings.build.width,
            self.settings.build.height,
            self.settings.build.fps
        ));

        let mut state = BuildState::new(&build_name);
        let pipeline = create_standard_pipeline(self.resolver.clone());
        logger.debug(&format!("Steps: {}", pipeline.step_names().join(" -> ")));
        let mut steps_completed = Vec::new();

        let outcome = pipeline.run(&ctx, &mut state).and_then(|run| {
            steps_completed = run.steps_completed;
            state.disc_dir.clone().ok_or_else(|| {
                PipelineError::step_failed("Finalize", BuildError::custom("No disc folder produced"))
            })
        });

        match &outcome {
            Ok(dir) => logger.success(&format!("Disc folder: {}", dir.display())),
            Err(e) if e.is_cancelled() => logger.warn("Build cancelled"),
            Err(e) => logger.error(&format!("Build failed: {}", e)),
        }

        let keep = match &outcome {
            Ok(_) => self.settings.build.keep_workspace,
            Err(e) => !e.is_cancelled(),
        };
        let kept_workspace = if keep {
            logger.info(&format!("Workspace kept at {}", workspace.path().display()));
            Some(workspace.path().to_path_buf())
        } else {
            workspace.remove();
            None
        };

        logger.close();

        match &outcome {
            Ok(dir) => self.session.finish_success(dir.clone()),
            Err(e) if e.is_cancelled() => self.session.finish_cancelled(),
            Err(e) => self.session.finish_failed(&e.to_string()),
        }

        BuildReport {
            build_name,
            outcome,
            tools: state.tools,
            estimate: state.estimate,
            steps_completed,
            log_path: Some(logger.log_path().to_path_buf()),
            kept_workspace,
        }
    }

    /// Log callback feeding the session accumulator (and the echo).
    fn log_callback(&self) -> LogCallback {
        let session = self.session.clone();
        let echo = self.log_echo.clone();
        Box::new(move |line: &str| {
            session.append_log(line);
            if let Some(ref echo) = echo {
                echo(line);
            }
        })
    }

    fn setup_failed(&self, build_name: String, message: String) -> BuildReport {
        tracing::error!("{}", message);
        let error = PipelineError::setup_failed(message);
        self.session.finish_failed(&error.to_string());
        BuildReport {
            build_name,
            ..BuildReport::not_started(error)
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::models::{AudioAttributes, OutputCodec};
    use crate::session::BuildStatus;
    use crate::test_support::write_script;

    const FAKE_FFMPEG: &str = r#"if [ "$1" = "-version" ]; then echo "ffmpeg version fake"; exit 0; fi
: > "$MARKER"
for a; do last="$a"; done; : > "$last""#;

    /// Records its pid, then blocks until killed.
    const SLEEPING_FFMPEG: &str = r#"if [ "$1" = "-version" ]; then echo "ffmpeg version fake"; exit 0; fi
echo $$ > "$MARKER"
exec sleep 30"#;

    const FAKE_TSMUXER: &str = r#"if [ $# -lt 2 ]; then echo "tsMuxeR version 2.6.12"; exit 0; fi
mkdir -p "$2/BDMV/STREAM"; printf 'data' > "$2/BDMV/STREAM/00000.m2ts""#;

    struct Fixture {
        dir: tempfile::TempDir,
        settings: Settings,
    }

    impl Fixture {
        fn new(tsmuxer_body: &str) -> Self {
            Self::with_tools(FAKE_FFMPEG, tsmuxer_body)
        }

        fn with_tools(ffmpeg_body: &str, tsmuxer_body: &str) -> Self {
            crate::logging::init_test_tracing();
            let dir = tempfile::tempdir().unwrap();
            let marker = dir.path().join("ffmpeg_ran");
            let bin = dir.path().join("bin");
            std::fs::create_dir_all(&bin).unwrap();

            let ffmpeg_body = ffmpeg_body.replace("$MARKER", &marker.display().to_string());
            let ffmpeg = write_script(&bin, "ffmpeg", &ffmpeg_body);
            let ffprobe = write_script(&bin, "ffprobe", "echo 'ffprobe version fake'");
            let tsmuxer = write_script(&bin, "tsMuxeR", tsmuxer_body);

            let mut settings = Settings::default();
            settings.paths.temp_root = dir.path().join("temp").display().to_string();
            settings.paths.logs_folder = dir.path().join("logs").display().to_string();
            settings.tools.ffmpeg = ffmpeg.display().to_string();
            settings.tools.ffprobe = ffprobe.display().to_string();
            settings.tools.tsmuxer = tsmuxer.display().to_string();
            settings.build.codec = OutputCodec::Lpcm;

            Self { dir, settings }
        }

        fn runner(&self) -> BuildRunner {
            BuildRunner::new(self.settings.clone(), BuildSession::new())
                .with_resolver(ToolResolver::new(Vec::new()).with_dirs(None, None))
        }

        fn request(&self) -> BuildRequest {
            let items = [2.0, 3.5]
                .iter()
                .enumerate()
                .map(|(i, duration)| {
                    AudioItem::new(self.dir.path().join(format!("{:02}.flac", i + 1)))
                        .with_attributes(AudioAttributes {
                            duration_secs: Some(*duration),
                            sample_rate: Some(48_000),
                            bit_depth: Some(24),
                            channels: Some(2),
                            codec_name: Some("flac".into()),
                        })
                })
                .collect();
            BuildRequest::new(items, self.dir.path().join("out"))
        }

        fn ffmpeg_ran(&self) -> bool {
            self.dir.path().join("ffmpeg_ran").exists()
        }

        fn workspaces(&self) -> usize {
            std::fs::read_dir(self.dir.path().join("temp"))
                .map(|entries| entries.count())
                .unwrap_or(0)
        }
    }

    #[test]
    fn builds_disc_folder_with_fake_tools() {
        let fixture = Fixture::new(FAKE_TSMUXER);
        let runner = fixture.runner();
        let report = runner.run(fixture.request());

        let disc = report.disc_dir().expect("build should succeed").to_path_buf();
        assert!(disc.join("BDMV").is_dir());
        assert!(disc.join("CERTIFICATE").is_dir());
        assert!(disc
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("BDMV_OUT_"));
        assert_eq!(report.steps_completed.len(), 7);
        assert!(report.tools.is_some());
        assert_eq!(report.estimate.map(|e| e.bytes), Some(4));

        let snap = runner.session().snapshot();
        assert_eq!(snap.status, BuildStatus::Succeeded);
        assert_eq!(snap.progress, 1.0);
        assert!(snap.log.iter().any(|l| l.contains("=== Locate and validate external tools ===")));

        // Workspace removed, descriptor kept in the build log
        assert_eq!(fixture.workspaces(), 0);
        let log = std::fs::read_to_string(report.log_path.unwrap()).unwrap();
        assert!(log.contains("MUXOPT --blu-ray --vbr 20000 --auto-chapters=0 --custom-chapters=00:00:00;00:00:02"));
        assert!(log.contains("A_LPCM"));
    }

    #[test]
    fn failed_mux_keeps_workspace_and_resets_progress() {
        let fixture = Fixture::new(
            r#"if [ $# -lt 2 ]; then echo "tsMuxeR version 2.6.12"; exit 0; fi
echo 'Invalid meta file' >&2; exit 1"#,
        );
        let runner = fixture.runner();
        let report = runner.run(fixture.request());

        match &report.outcome {
            Err(PipelineError::StepFailed { step, source }) => {
                assert_eq!(step, "Mux");
                assert!(source.to_string().contains("Invalid meta file"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(report.kept_workspace.as_ref().is_some_and(|p| p.is_dir()));

        let snap = runner.session().snapshot();
        assert_eq!(snap.status, BuildStatus::Failed);
        assert_eq!(snap.progress, 0.0);
        assert!(snap.log.iter().any(|l| l.contains("[ERROR]")));
    }

    #[test]
    fn cancel_before_audio_spawns_no_transcoder() {
        let fixture = Fixture::new(FAKE_TSMUXER);
        let session = BuildSession::new();
        let canceller = session.clone();
        let runner = BuildRunner::new(fixture.settings.clone(), session)
            .with_resolver(ToolResolver::new(Vec::new()).with_dirs(None, None))
            .with_log_echo(move |line| {
                if line.contains("Resolve tools completed") {
                    canceller.cancel();
                }
            });

        let report = runner.run(fixture.request());

        assert!(matches!(report.outcome, Err(PipelineError::Cancelled)));
        assert!(!fixture.ffmpeg_ran());
        assert_eq!(runner.session().status(), BuildStatus::Cancelled);
        assert!(report.kept_workspace.is_none());
        assert_eq!(fixture.workspaces(), 0);
        assert!(!fixture.dir.path().join("out").exists());
    }

    #[test]
    fn cancel_during_transcode_kills_the_tool() {
        use std::process::{Command, Stdio};
        use std::thread;
        use std::time::{Duration, Instant};

        let fixture = Fixture::with_tools(SLEEPING_FFMPEG, FAKE_TSMUXER);
        let runner = fixture.runner();
        let session = runner.session().clone();
        let pid_file = fixture.dir.path().join("ffmpeg_ran");

        let canceller = thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_secs(10);
            loop {
                let pid = std::fs::read_to_string(&pid_file).unwrap_or_default();
                if !pid.trim().is_empty() {
                    assert!(session.cancel());
                    return pid.trim().to_string();
                }
                assert!(Instant::now() < deadline, "transcoder never started");
                thread::sleep(Duration::from_millis(10));
            }
        });

        let started = Instant::now();
        let report = runner.run(fixture.request());
        let pid = canceller.join().unwrap();

        assert!(matches!(report.outcome, Err(PipelineError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(20));
        assert_eq!(runner.session().supervisor().live_count(), 0);
        assert_eq!(runner.session().status(), BuildStatus::Cancelled);
        assert!(report.kept_workspace.is_none());

        let alive = Command::new("kill")
            .args(["-0", pid.as_str()])
            .stderr(Stdio::null())
            .status()
            .unwrap();
        assert!(!alive.success());
    }

    #[test]
    fn second_build_is_rejected_while_running() {
        let fixture = Fixture::new(FAKE_TSMUXER);
        let runner = fixture.runner();
        runner.session().begin().unwrap();

        let report = runner.run(fixture.request());
        assert!(matches!(report.outcome, Err(PipelineError::AlreadyRunning)));
        assert_eq!(runner.session().status(), BuildStatus::Running);
        assert!(!fixture.ffmpeg_ran());
    }

    #[test]
    fn empty_track_list_fails_with_no_items() {
        let fixture = Fixture::new(FAKE_TSMUXER);
        let runner = fixture.runner();
        let report = runner.run(BuildRequest::new(Vec::new(), fixture.dir.path().join("out")));

        assert!(matches!(
            report.outcome,
            Err(PipelineError::StepFailed {
                source: BuildError::NoItems,
                ..
            })
        ));
        assert!(!fixture.ffmpeg_ran());
    }
}
