//! Pipeline runner that executes steps in sequence.

use super::errors::{PipelineError, PipelineResult};
use super::step::PipelineStep;
use super::types::{BuildState, Context};

/// Pipeline that runs a sequence of steps.
///
/// Steps run strictly one after another. The context's cancel token is
/// checked before each step, so nothing of step N+1 starts once a
/// cancellation has been seen.
pub struct Pipeline {
    steps: Vec<Box<dyn PipelineStep>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn add_step<S: PipelineStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Add a step (builder pattern).
    pub fn with_step<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    /// Run every step against `ctx`, recording results in `state`.
    pub fn run(&self, ctx: &Context, state: &mut BuildState) -> PipelineResult<PipelineRunResult> {
        let mut result = PipelineRunResult::default();

        for step in &self.steps {
            let step_name = step.name();

            if ctx.cancel_token().is_cancelled() {
                ctx.logger
                    .warn(&format!("Build cancelled before step '{}'", step_name));
                return Err(PipelineError::Cancelled);
            }

            ctx.logger.phase(step.description());
            // Failure tails only show output of the failing step
            ctx.logger.clear_tail();
            step.report(ctx, 0.0, step.description());

            ctx.logger.debug(&format!("Validating input for '{}'", step_name));
            if let Err(e) = step.validate_input(ctx, state) {
                ctx.logger.error(&format!("Input validation failed: {}", e));
                return Err(PipelineError::step_failed(step_name, e));
            }

            step.execute(ctx, state).map_err(|e| {
                if e.is_cancelled() {
                    ctx.logger.warn(&format!("{} cancelled", step_name));
                } else {
                    ctx.logger.error(&format!("{} failed: {}", step_name, e));
                }
                PipelineError::step_failed(step_name, e)
            })?;

            if let Err(e) = step.validate_output(ctx, state) {
                ctx.logger.error(&format!("Output validation failed: {}", e));
                return Err(PipelineError::step_failed(step_name, e));
            }
            ctx.logger.success(&format!("{} completed", step_name));
            result.steps_completed.push(step_name.to_string());
            step.report(ctx, 1.0, &format!("{} done", step_name));
        }

        ctx.report_progress(1.0, "Done");
        ctx.logger.success("Build completed successfully");

        Ok(result)
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineRunResult {
    pub steps_completed: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BuildError, BuildResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingStep {
        name: &'static str,
        range: (f64, f64),
        count: Arc<AtomicUsize>,
        fail: bool,
    }

    impl CountingStep {
        fn new(name: &'static str, range: (f64, f64), count: &Arc<AtomicUsize>) -> Self {
            Self {
                name,
                range,
                count: Arc::clone(count),
                fail: false,
            }
        }
    }

    impl PipelineStep for CountingStep {
        fn name(&self) -> &str {
            self.name
        }

        fn progress_range(&self) -> (f64, f64) {
            self.range
        }

        fn validate_input(&self, _ctx: &Context, _state: &BuildState) -> BuildResult<()> {
            Ok(())
        }

        fn execute(&self, _ctx: &Context, _state: &mut BuildState) -> BuildResult<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(BuildError::custom("boom"));
            }
            Ok(())
        }

        fn validate_output(&self, _ctx: &Context, _state: &BuildState) -> BuildResult<()> {
            Ok(())
        }
    }

    #[test]
    fn pipeline_builds_correctly() {
        let count = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new()
            .with_step(CountingStep::new("Step1", (0.0, 0.5), &count))
            .with_step(CountingStep::new("Step2", (0.5, 1.0), &count));

        assert_eq!(pipeline.step_names(), vec!["Step1", "Step2"]);
    }

    #[test]
    fn runs_all_steps_with_rising_progress() {
        let count = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new()
            .with_step(CountingStep::new("A", (0.0, 0.3), &count))
            .with_step(CountingStep::new("B", (0.3, 0.9), &count));

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let ctx = Context::for_tests()
            .with_progress_callback(Box::new(move |f, _| sink.lock().push(f)));

        let result = pipeline.run(&ctx, &mut BuildState::new("t")).unwrap();
        assert_eq!(result.steps_completed, vec!["A", "B"]);
        assert_eq!(count.load(Ordering::SeqCst), 2);

        let seen = seen.lock();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last().copied(), Some(1.0));
    }

    #[test]
    fn failure_stops_later_steps() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut failing = CountingStep::new("Broken", (0.0, 0.5), &count);
        failing.fail = true;
        let pipeline = Pipeline::new()
            .with_step(failing)
            .with_step(CountingStep::new("Never", (0.5, 1.0), &count));

        let err = pipeline
            .run(&Context::for_tests(), &mut BuildState::new("t"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::StepFailed { ref step, .. } if step == "Broken"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_between_steps_stops_pipeline() {
        let count = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new()
            .with_step(CountingStep::new("First", (0.0, 0.5), &count))
            .with_step(CountingStep::new("Second", (0.5, 1.0), &count));

        let ctx = Context::for_tests();
        let token = ctx.cancel_token().clone();
        let ctx = ctx.with_progress_callback(Box::new(move |f, _| {
            if f >= 0.5 {
                token.cancel();
            }
        }));

        let err = pipeline.run(&ctx, &mut BuildState::new("t")).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    /// Writes tool output, then optionally fails and dumps the tail.
    struct ToolOutputStep {
        name: &'static str,
        output: &'static str,
        fail: bool,
    }

    impl PipelineStep for ToolOutputStep {
        fn name(&self) -> &str {
            self.name
        }

        fn progress_range(&self) -> (f64, f64) {
            (0.0, 1.0)
        }

        fn validate_input(&self, _ctx: &Context, _state: &BuildState) -> BuildResult<()> {
            Ok(())
        }

        fn execute(&self, ctx: &Context, _state: &mut BuildState) -> BuildResult<()> {
            ctx.logger.output_line(self.output, true);
            if self.fail {
                ctx.logger.show_tail(self.name);
                return Err(BuildError::custom("tool failed"));
            }
            Ok(())
        }

        fn validate_output(&self, _ctx: &Context, _state: &BuildState) -> BuildResult<()> {
            Ok(())
        }
    }

    fn capturing_context() -> (Context, Arc<parking_lot::Mutex<Vec<String>>>) {
        use crate::logging::{BuildLogger, LogConfig};

        let lines = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let mut ctx = Context::for_tests();
        ctx.logger = Arc::new(BuildLogger::callback_only(
            "t",
            LogConfig::default(),
            Some(Box::new(move |line: &str| sink.lock().push(line.to_string()))),
        ));
        (ctx, lines)
    }

    #[test]
    fn progress_lands_in_build_log() {
        let count = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new()
            .with_step(CountingStep::new("A", (0.0, 0.5), &count))
            .with_step(CountingStep::new("B", (0.5, 1.0), &count));
        let (ctx, lines) = capturing_context();

        pipeline.run(&ctx, &mut BuildState::new("t")).unwrap();

        let lines = lines.lock();
        let progress: Vec<_> = lines.iter().filter(|l| l.contains("Progress: ")).collect();
        assert!(progress.first().is_some_and(|l| l.ends_with("Progress: 0%")));
        assert!(progress.iter().any(|l| l.ends_with("Progress: 50%")));
        assert!(progress.last().is_some_and(|l| l.ends_with("Progress: 100%")));
    }

    #[test]
    fn failure_tail_shows_only_failing_step_output() {
        let pipeline = Pipeline::new()
            .with_step(ToolOutputStep {
                name: "Audio",
                output: "audio chatter",
                fail: false,
            })
            .with_step(ToolOutputStep {
                name: "Mux",
                output: "Invalid meta file",
                fail: true,
            });
        let (ctx, lines) = capturing_context();

        pipeline.run(&ctx, &mut BuildState::new("t")).unwrap_err();

        let lines = lines.lock();
        let tail_start = lines
            .iter()
            .position(|l| l.ends_with("[Mux/tail]"))
            .expect("tail header");
        let tail = &lines[tail_start..];
        assert!(tail.iter().any(|l| l.ends_with("Invalid meta file")));
        assert!(!tail.iter().any(|l| l.contains("audio chatter")));
    }
}
