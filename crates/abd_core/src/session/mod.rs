//! State of the single active build.
//!
//! `BuildSession` is a cheap cloneable handle. The build worker writes
//! through its setters; every other reader takes a [`SessionSnapshot`].

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::capacity::SizeEstimate;
use crate::logging::LogCallback;
use crate::orchestrator::{PipelineError, PipelineResult};
use crate::process::{CancelToken, ProcessSupervisor};

/// Lines kept in the session log accumulator.
const MAX_LOG_LINES: usize = 5_000;

/// Lifecycle of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

/// Point-in-time copy of the session state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSnapshot {
    pub status: BuildStatus,
    pub working: bool,
    pub cancel_requested: bool,
    /// Fraction in `[0, 1]`.
    pub progress: f64,
    pub status_text: String,
    pub estimate: Option<SizeEstimate>,
    pub log: Vec<String>,
    pub output_dir: Option<PathBuf>,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct SessionState {
    status: BuildStatus,
    progress: f64,
    status_text: String,
    estimate: Option<SizeEstimate>,
    log: VecDeque<String>,
    output_dir: Option<PathBuf>,
    error: Option<String>,
}

struct SessionInner {
    state: Mutex<SessionState>,
    cancel: CancelToken,
    supervisor: Arc<ProcessSupervisor>,
}

/// Handle to the build session.
#[derive(Clone)]
pub struct BuildSession {
    inner: Arc<SessionInner>,
}

impl BuildSession {
    pub fn new() -> Self {
        Self::with_supervisor(Arc::new(ProcessSupervisor::new()))
    }

    pub fn with_supervisor(supervisor: Arc<ProcessSupervisor>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                state: Mutex::new(SessionState::default()),
                cancel: CancelToken::new(),
                supervisor,
            }),
        }
    }

    /// Start a build.
    ///
    /// Fails with `AlreadyRunning` while another build is in flight.
    /// Otherwise clears the previous build's progress, log and result.
    pub fn begin(&self) -> PipelineResult<()> {
        let mut state = self.inner.state.lock();
        if state.status == BuildStatus::Running {
            return Err(PipelineError::AlreadyRunning);
        }
        *state = SessionState {
            status: BuildStatus::Running,
            status_text: "Starting".to_string(),
            ..Default::default()
        };
        self.inner.cancel.reset();
        Ok(())
    }

    /// Request cancellation of the running build.
    ///
    /// Sets the shared token and kills every registered process. Returns
    /// `false` when no build is running.
    pub fn cancel(&self) -> bool {
        if !self.is_working() {
            return false;
        }
        self.inner.cancel.cancel();
        let killed = self.inner.supervisor.terminate_all();
        tracing::info!("Cancellation requested ({} process(es) signalled)", killed);
        self.set_status("Cancelling");
        true
    }

    /// Set progress and status text. Progress never moves backwards within
    /// a build.
    pub fn set_progress(&self, fraction: f64, text: &str) {
        let mut state = self.inner.state.lock();
        if state.status != BuildStatus::Running {
            return;
        }
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        state.progress = state.progress.max(fraction);
        state.status_text = text.to_string();
    }

    pub fn set_status(&self, text: &str) {
        self.inner.state.lock().status_text = text.to_string();
    }

    pub fn set_estimate(&self, estimate: SizeEstimate) {
        self.inner.state.lock().estimate = Some(estimate);
    }

    /// Append a line to the log accumulator.
    pub fn append_log(&self, line: &str) {
        let mut state = self.inner.state.lock();
        if state.log.len() == MAX_LOG_LINES {
            state.log.pop_front();
        }
        state.log.push_back(line.to_string());
    }

    /// Callback feeding build log lines into this session.
    pub fn log_callback(&self) -> LogCallback {
        let session = self.clone();
        Box::new(move |line: &str| session.append_log(line))
    }

    pub fn finish_success(&self, output_dir: PathBuf) {
        let mut state = self.inner.state.lock();
        state.status = BuildStatus::Succeeded;
        state.progress = 1.0;
        state.status_text = "Done".to_string();
        state.output_dir = Some(output_dir);
    }

    /// Mark the build failed. Progress goes back to zero.
    pub fn finish_failed(&self, error: &str) {
        let mut state = self.inner.state.lock();
        state.status = BuildStatus::Failed;
        state.progress = 0.0;
        state.status_text = "Failed".to_string();
        state.error = Some(error.to_string());
    }

    pub fn finish_cancelled(&self) {
        let mut state = self.inner.state.lock();
        state.status = BuildStatus::Cancelled;
        state.progress = 0.0;
        state.status_text = "Cancelled".to_string();
    }

    pub fn is_working(&self) -> bool {
        self.inner.state.lock().status == BuildStatus::Running
    }

    pub fn status(&self) -> BuildStatus {
        self.inner.state.lock().status
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.inner.cancel.clone()
    }

    pub fn supervisor(&self) -> &Arc<ProcessSupervisor> {
        &self.inner.supervisor
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.state.lock();
        SessionSnapshot {
            status: state.status,
            working: state.status == BuildStatus::Running,
            cancel_requested: self.inner.cancel.is_cancelled(),
            progress: state.progress,
            status_text: state.status_text.clone(),
            estimate: state.estimate,
            log: state.log.iter().cloned().collect(),
            output_dir: state.output_dir.clone(),
            error: state.error.clone(),
        }
    }
}

impl Default for BuildSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::EstimateStage;

    #[test]
    fn second_begin_is_rejected() {
        let session = BuildSession::new();
        session.begin().unwrap();
        assert!(matches!(session.begin(), Err(PipelineError::AlreadyRunning)));

        session.finish_success(PathBuf::from("/out/BDMV_OUT_1"));
        assert!(session.begin().is_ok());
    }

    #[test]
    fn progress_is_monotonic_and_clamped() {
        let session = BuildSession::new();
        session.begin().unwrap();
        session.set_progress(0.4, "Audio");
        session.set_progress(0.2, "Late update");
        assert!((session.snapshot().progress - 0.4).abs() < f64::EPSILON);
        session.set_progress(7.0, "Overshoot");
        assert!((session.snapshot().progress - 1.0).abs() < f64::EPSILON);
        session.set_progress(f64::NAN, "Garbage");
        assert!((session.snapshot().progress - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn failure_resets_progress() {
        let session = BuildSession::new();
        session.begin().unwrap();
        session.set_progress(0.6, "Video");
        session.finish_failed("ffmpeg failed");
        let snap = session.snapshot();
        assert_eq!(snap.status, BuildStatus::Failed);
        assert_eq!(snap.progress, 0.0);
        assert_eq!(snap.error.as_deref(), Some("ffmpeg failed"));
        assert!(!snap.working);
    }

    #[test]
    fn begin_clears_previous_build() {
        let session = BuildSession::new();
        session.begin().unwrap();
        session.append_log("first build");
        session.set_estimate(SizeEstimate::new(EstimateStage::PreBuild, 10));
        session.cancel();
        session.finish_cancelled();

        session.begin().unwrap();
        let snap = session.snapshot();
        assert!(snap.log.is_empty());
        assert!(snap.estimate.is_none());
        assert!(!snap.cancel_requested);
        assert_eq!(snap.status, BuildStatus::Running);
    }

    #[test]
    fn cancel_without_build_is_noop() {
        let session = BuildSession::new();
        assert!(!session.cancel());
        assert!(!session.cancel_token().is_cancelled());
    }

    #[test]
    fn log_callback_accumulates() {
        let session = BuildSession::new();
        let callback = session.log_callback();
        callback("$ ffmpeg -version");
        callback("[SUCCESS] done");
        assert_eq!(session.snapshot().log.len(), 2);
    }

    #[test]
    fn log_is_bounded() {
        let session = BuildSession::new();
        for i in 0..(MAX_LOG_LINES + 10) {
            session.append_log(&i.to_string());
        }
        let log = session.snapshot().log;
        assert_eq!(log.len(), MAX_LOG_LINES);
        assert_eq!(log[0], "10");
    }
}
