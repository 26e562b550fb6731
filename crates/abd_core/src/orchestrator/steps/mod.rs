//! Pipeline step implementations.
//!
//! One step per build stage, in pipeline order.

mod audio;
mod chapters;
mod descriptor;
mod finalize;
mod mux;
mod resolve_tools;
mod video;

pub use audio::PrepareAudioStep;
pub use chapters::ChaptersStep;
pub use descriptor::DescriptorStep;
pub use finalize::FinalizeStep;
pub use mux::MuxStep;
pub use resolve_tools::ResolveToolsStep;
pub use video::SynthesizeVideoStep;

use crate::error::{BuildError, BuildResult};

/// Result of an earlier step, or an error naming what is missing.
fn require<'a, T>(value: Option<&'a T>, what: &str) -> BuildResult<&'a T> {
    value.ok_or_else(|| BuildError::custom(format!("Missing {} from an earlier step", what)))
}
