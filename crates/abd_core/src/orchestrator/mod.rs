//! Build pipeline.
//!
//! ```text
//! Pipeline
//!     ├── Step: Resolve tools
//!     ├── Step: Prepare audio
//!     ├── Step: Synthesize video
//!     ├── Step: Chapters
//!     ├── Step: Descriptor
//!     ├── Step: Mux
//!     └── Step: Finalize
//! ```
//!
//! [`BuildRunner`] wires a pipeline run to a [`crate::session::BuildSession`],
//! a workspace and a build logger.

mod errors;
mod pipeline;
mod runner;
mod step;
pub mod steps;
mod types;

pub use errors::{PipelineError, PipelineResult};
pub use pipeline::{Pipeline, PipelineRunResult};
pub use runner::{BuildReport, BuildRequest, BuildRunner};
pub use step::PipelineStep;
pub use steps::{
    ChaptersStep, DescriptorStep, FinalizeStep, MuxStep, PrepareAudioStep, ResolveToolsStep,
    SynthesizeVideoStep,
};
pub use types::{BuildState, ChaptersOutput, Context, EstimateCallback, ProgressCallback};

use crate::tools::ToolResolver;

/// Create the standard pipeline with all steps in order.
pub fn create_standard_pipeline(resolver: ToolResolver) -> Pipeline {
    Pipeline::new()
        .with_step(ResolveToolsStep::new(resolver))
        .with_step(PrepareAudioStep::new())
        .with_step(SynthesizeVideoStep::new())
        .with_step(ChaptersStep::new())
        .with_step(DescriptorStep::new())
        .with_step(MuxStep::new())
        .with_step(FinalizeStep::new())
}
