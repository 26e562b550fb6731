//! Core types for the build pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capacity::{CapacityEstimator, SizeEstimate};
use crate::chapters::ChapterMark;
use crate::config::Settings;
use crate::logging::BuildLogger;
use crate::models::{AudioItem, PreparedAudio};
use crate::process::{CancelToken, ProcessRunner};
use crate::tools::ResolvedTools;
use crate::video::TextOverlay;

/// Progress callback. Arguments: (overall fraction 0-1, message)
pub type ProgressCallback = Box<dyn Fn(f64, &str) + Send + Sync>;

/// Receives each refined size estimate.
pub type EstimateCallback = Box<dyn Fn(SizeEstimate) + Send + Sync>;

/// Read-only context passed to pipeline steps.
///
/// Holds the frozen track list and shared resources. Results go in
/// `BuildState`.
pub struct Context {
    pub build_name: String,
    /// Settings as of build start.
    pub settings: Settings,
    /// Tracks in disc order, frozen for this build.
    pub items: Vec<AudioItem>,
    /// Timed text for black-screen video.
    pub overlays: Vec<TextOverlay>,
    /// Build workspace (under temp_root).
    pub work_dir: PathBuf,
    /// Folder that receives the `BDMV_OUT_*` folder.
    pub output_dir: PathBuf,
    pub logger: Arc<BuildLogger>,
    /// Runner sharing the session's cancel token and supervisor.
    pub runner: ProcessRunner,
    pub estimator: CapacityEstimator,
    progress_callback: Option<ProgressCallback>,
    estimate_callback: Option<EstimateCallback>,
}

impl Context {
    pub fn new(
        build_name: impl Into<String>,
        settings: Settings,
        items: Vec<AudioItem>,
        work_dir: PathBuf,
        output_dir: PathBuf,
        logger: Arc<BuildLogger>,
        runner: ProcessRunner,
    ) -> Self {
        let estimator = CapacityEstimator::new(settings.estimate.clone());
        Self {
            build_name: build_name.into(),
            settings,
            items,
            overlays: Vec::new(),
            work_dir,
            output_dir,
            logger,
            runner,
            estimator,
            progress_callback: None,
            estimate_callback: None,
        }
    }

    pub fn with_overlays(mut self, overlays: Vec<TextOverlay>) -> Self {
        self.overlays = overlays;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_estimate_callback(mut self, callback: EstimateCallback) -> Self {
        self.estimate_callback = Some(callback);
        self
    }

    /// Report overall progress to the build log and the callback (if set).
    pub fn report_progress(&self, fraction: f64, message: &str) {
        if fraction.is_finite() {
            self.logger
                .progress((fraction.clamp(0.0, 1.0) * 100.0).floor() as u32);
        }
        if let Some(ref callback) = self.progress_callback {
            callback(fraction, message);
        }
    }

    /// Log and forward a refined size estimate.
    pub fn report_estimate(&self, estimate: SizeEstimate) {
        self.logger.info(&format!("Estimated size: {}", estimate));
        if let Some(ref callback) = self.estimate_callback {
            callback(estimate);
        }
    }

    pub fn cancel_token(&self) -> &CancelToken {
        self.runner.cancel_token()
    }

    /// Runner whose `PATH` includes the resolved tools' directories.
    pub fn tool_runner(&self, tools: &ResolvedTools) -> ProcessRunner {
        self.runner.clone().with_tool_dirs(&tools.dirs())
    }

}

#[cfg(test)]
impl Context {
    /// Context with default settings and a callback-only logger.
    pub(crate) fn for_tests() -> Self {
        use crate::logging::LogConfig;
        use crate::process::ProcessSupervisor;

        let runner = ProcessRunner::new(Arc::new(ProcessSupervisor::new()), CancelToken::new());
        Self::new(
            "test",
            Settings::default(),
            Vec::new(),
            PathBuf::from("work"),
            PathBuf::from("out"),
            Arc::new(BuildLogger::callback_only("test", LogConfig::default(), None)),
            runner,
        )
    }
}

/// Chapter stage result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChaptersOutput {
    pub path: PathBuf,
    pub marks: Vec<ChapterMark>,
}

/// Results accumulated by the pipeline steps.
///
/// Each step fills its own field; later steps read earlier ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildState {
    pub build_id: String,
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ResolvedTools>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<PreparedAudio>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapters: Option<ChaptersOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<PathBuf>,
    /// `BDMV_OUT_*` folder produced by the multiplexer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disc_dir: Option<PathBuf>,
    /// Latest size estimate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<SizeEstimate>,
}

impl BuildState {
    pub fn new(build_id: impl Into<String>) -> Self {
        Self {
            build_id: build_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_state_serializes_filled_fields_only() {
        let mut state = BuildState::new("build_20250101_000000");
        state.video = Some(PathBuf::from("/w/video.h264"));
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"build_id\":\"build_20250101_000000\""));
        assert!(json.contains("video.h264"));
        assert!(!json.contains("\"audio\""));
    }

    #[test]
    fn estimate_callback_receives_refinements() {
        use crate::capacity::EstimateStage;
        use std::sync::Mutex;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let ctx = Context::for_tests().with_estimate_callback(Box::new(move |e| {
            sink.lock().unwrap().push(e.bytes);
        }));
        ctx.report_estimate(SizeEstimate::new(EstimateStage::AfterAudio, 42));
        assert_eq!(*seen.lock().unwrap(), vec![42]);
    }
}
