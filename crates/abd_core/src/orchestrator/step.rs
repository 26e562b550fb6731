//! Pipeline step trait definition.

use super::types::{BuildState, Context};
use crate::error::BuildResult;

/// Trait for pipeline steps.
///
/// The pipeline calls these methods in order:
///
/// 1. `validate_input` - check preconditions (earlier steps' results)
/// 2. `execute` - run the stage and record its result in `state`
/// 3. `validate_output` - verify the stage produced what later steps need
pub trait PipelineStep: Send + Sync {
    /// Step name (for logging and error context).
    fn name(&self) -> &str;

    /// Overall progress fractions at the start and end of this step.
    fn progress_range(&self) -> (f64, f64);

    fn validate_input(&self, ctx: &Context, state: &BuildState) -> BuildResult<()>;

    fn execute(&self, ctx: &Context, state: &mut BuildState) -> BuildResult<()>;

    fn validate_output(&self, ctx: &Context, state: &BuildState) -> BuildResult<()>;

    /// Human-readable description of what this step does.
    fn description(&self) -> &str {
        self.name()
    }

    /// Report progress `fraction` (0-1) of the way through this step.
    fn report(&self, ctx: &Context, fraction: f64, message: &str) {
        let (start, end) = self.progress_range();
        ctx.report_progress(start + (end - start) * fraction.clamp(0.0, 1.0), message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockStep;

    impl PipelineStep for MockStep {
        fn name(&self) -> &str {
            "Mock"
        }

        fn progress_range(&self) -> (f64, f64) {
            (0.2, 0.6)
        }

        fn validate_input(&self, _ctx: &Context, _state: &BuildState) -> BuildResult<()> {
            Ok(())
        }

        fn execute(&self, _ctx: &Context, _state: &mut BuildState) -> BuildResult<()> {
            Ok(())
        }

        fn validate_output(&self, _ctx: &Context, _state: &BuildState) -> BuildResult<()> {
            Ok(())
        }
    }

    #[test]
    fn step_trait_object_works() {
        let step: Box<dyn PipelineStep> = Box::new(MockStep);
        assert_eq!(step.name(), "Mock");
        assert_eq!(step.description(), "Mock");
    }

    #[test]
    fn report_maps_into_range() {
        use std::sync::{Arc, Mutex};

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let ctx = Context::for_tests().with_progress_callback(Box::new(move |f, _| {
            sink.lock().unwrap().push(f);
        }));

        MockStep.report(&ctx, 0.5, "half");
        MockStep.report(&ctx, 2.0, "over");
        let seen = seen.lock().unwrap();
        assert!((seen[0] - 0.4).abs() < 1e-9);
        assert!((seen[1] - 0.6).abs() < 1e-9);
    }
}
