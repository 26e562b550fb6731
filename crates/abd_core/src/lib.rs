//! ABD Core - Backend logic for Audio Blu-ray Author
//!
//! Turns a list of audio tracks into a playable Blu-ray folder by driving
//! ffprobe, ffmpeg and tsMuxeR. This crate has zero UI dependencies; the
//! `audio-bluray` CLI is one front end.

pub mod audio;
pub mod burn;
pub mod capacity;
pub mod chapters;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod mux;
pub mod orchestrator;
pub mod probe;
pub mod process;
pub mod session;
pub mod tools;
pub mod video;
pub mod workspace;

#[cfg(test)]
mod test_support;

pub use error::{BuildError, BuildResult};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
