//! Output size estimation and the burn-time capacity check.
//!
//! The estimate is refined as the build produces real files:
//! 1. before anything runs, from PCM bitrate math or source sizes
//! 2. after audio, from the prepared stream plus a video placeholder
//! 3. after video, from both streams plus mux overhead
//! 4. after muxing, the real size of the disc folder

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::audio::LpcmPlan;
use crate::config::EstimateSettings;
use crate::error::{BuildError, BuildResult};
use crate::models::{AudioItem, DiscCapacity, LpcmFormat, OutputCodec};

/// Which refinement produced an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateStage {
    PreBuild,
    AfterAudio,
    AfterVideo,
    Final,
}

impl EstimateStage {
    pub fn name(&self) -> &'static str {
        match self {
            EstimateStage::PreBuild => "pre-build",
            EstimateStage::AfterAudio => "after audio",
            EstimateStage::AfterVideo => "after video",
            EstimateStage::Final => "final",
        }
    }
}

/// A size estimate in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeEstimate {
    pub stage: EstimateStage,
    pub bytes: u64,
}

impl SizeEstimate {
    pub fn new(stage: EstimateStage, bytes: u64) -> Self {
        Self { stage, bytes }
    }

    /// Size in gigabytes (10^9), for display.
    pub fn gigabytes(&self) -> f64 {
        self.bytes as f64 / 1e9
    }
}

impl std::fmt::Display for SizeEstimate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} GB ({})", self.gigabytes(), self.stage.name())
    }
}

/// Size estimator using the `[estimate]` constants.
#[derive(Debug, Clone)]
pub struct CapacityEstimator {
    settings: EstimateSettings,
}

impl CapacityEstimator {
    pub fn new(settings: EstimateSettings) -> Self {
        Self { settings }
    }

    /// Bytes of placeholder video for `duration` seconds.
    pub fn video_placeholder_bytes(&self, duration: f64) -> u64 {
        (self.settings.video_bitrate_bps as f64 / 8.0 * duration.max(0.0)).round() as u64
    }

    /// Rough estimate before any transcoding.
    ///
    /// LPCM sizes come from rate x depth x channels x duration; pass-through
    /// uses the source file sizes. Unknown durations count as zero.
    pub fn pre_build(
        &self,
        items: &[AudioItem],
        codec: OutputCodec,
        lpcm_format: Option<LpcmFormat>,
    ) -> SizeEstimate {
        let duration: f64 = items.iter().filter_map(AudioItem::duration_secs).sum();

        let audio = match codec {
            OutputCodec::Lpcm => {
                let plan = LpcmPlan::for_items(items, lpcm_format);
                let bytes_per_sec = plan.sample_rate as f64
                    * (plan.bit_depth as f64 / 8.0)
                    * plan.channels as f64;
                (bytes_per_sec * duration).round() as u64
            }
            OutputCodec::TrueHd | OutputCodec::DtsHd => {
                items.iter().map(|item| file_size(&item.path)).sum()
            }
        };

        let raw = audio + self.video_placeholder_bytes(duration);
        SizeEstimate::new(EstimateStage::PreBuild, self.with_overhead(raw))
    }

    /// Estimate once the prepared audio exists.
    pub fn after_audio(&self, audio_bytes: u64, duration: f64) -> SizeEstimate {
        SizeEstimate::new(
            EstimateStage::AfterAudio,
            audio_bytes + self.video_placeholder_bytes(duration),
        )
    }

    /// Estimate once both elementary streams exist.
    pub fn after_video(&self, audio_bytes: u64, video_bytes: u64) -> SizeEstimate {
        SizeEstimate::new(
            EstimateStage::AfterVideo,
            self.with_overhead(audio_bytes + video_bytes),
        )
    }

    /// True size of the produced disc folder.
    pub fn final_size(&self, disc_dir: &Path) -> BuildResult<SizeEstimate> {
        Ok(SizeEstimate::new(
            EstimateStage::Final,
            directory_size(disc_dir)?,
        ))
    }

    fn with_overhead(&self, bytes: u64) -> u64 {
        (bytes as f64 * (1.0 + self.settings.mux_overhead.max(0.0))).round() as u64
    }
}

impl Default for CapacityEstimator {
    fn default() -> Self {
        Self::new(EstimateSettings::default())
    }
}

/// Size of a file, 0 when it cannot be read.
pub fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Recursive size of all files under `dir`.
pub fn directory_size(dir: &Path) -> BuildResult<u64> {
    let mut total = 0;
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(walk_error)?;
        if entry.file_type().is_file() {
            total += entry.metadata().map_err(walk_error)?.len();
        }
    }
    Ok(total)
}

fn walk_error(err: walkdir::Error) -> BuildError {
    let message = err.to_string();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other(message));
    BuildError::io("sizing output folder", source)
}

/// Burn-time check that the disc folder fits the selected disc.
///
/// Returns the folder size, or `CapacityExceeded` when it is strictly
/// larger than the budget.
pub fn preflight(disc_dir: &Path, capacity: DiscCapacity) -> BuildResult<u64> {
    let size = directory_size(disc_dir)?;
    check_fits(size, capacity)?;
    Ok(size)
}

/// `CapacityExceeded` iff `size > capacity`.
pub fn check_fits(size: u64, capacity: DiscCapacity) -> BuildResult<()> {
    if capacity.is_exceeded_by(size) {
        return Err(BuildError::CapacityExceeded {
            size,
            budget: capacity.bytes(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AudioAttributes;
    use crate::test_support::write_sized;

    fn item(duration: f64) -> AudioItem {
        AudioItem::new("track.flac").with_attributes(AudioAttributes {
            duration_secs: Some(duration),
            sample_rate: Some(96_000),
            bit_depth: Some(24),
            channels: Some(2),
            codec_name: Some("flac".into()),
        })
    }

    #[test]
    fn lpcm_pre_build_uses_bitrate_math() {
        let estimator = CapacityEstimator::new(EstimateSettings {
            video_bitrate_bps: 0,
            mux_overhead: 0.0,
        });
        let estimate = estimator.pre_build(&[item(10.0)], OutputCodec::Lpcm, None);
        // 96 kHz * 3 bytes * 2 channels * 10 s
        assert_eq!(estimate.bytes, 5_760_000);
        assert_eq!(estimate.stage, EstimateStage::PreBuild);
    }

    #[test]
    fn pre_build_is_monotonic_in_duration() {
        let estimator = CapacityEstimator::default();
        for codec in [OutputCodec::Lpcm, OutputCodec::TrueHd, OutputCodec::DtsHd] {
            let mut previous = 0;
            for minutes in [0.0, 0.5, 1.0, 10.0, 60.0, 240.0] {
                let bytes = estimator.pre_build(&[item(minutes * 60.0)], codec, None).bytes;
                assert!(bytes >= previous, "{codec:?} shrank at {minutes} min");
                previous = bytes;
            }
        }

        let mut previous = 0;
        for secs in [0.0, 30.0, 600.0, 7200.0] {
            let bytes = estimator.after_audio(1_000_000, secs).bytes;
            assert!(bytes >= previous);
            previous = bytes;
        }
    }

    #[test]
    fn passthrough_uses_source_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("album.thd");
        write_sized(&path, 4_000_000);
        let items = vec![AudioItem::new(&path).with_attributes(AudioAttributes {
            duration_secs: Some(16.0),
            ..Default::default()
        })];

        let estimator = CapacityEstimator::new(EstimateSettings {
            video_bitrate_bps: 500_000,
            mux_overhead: 0.0,
        });
        // 4 MB audio + 0.5 Mbps * 16 s = 1 MB
        assert_eq!(
            estimator.pre_build(&items, OutputCodec::TrueHd, None).bytes,
            5_000_000
        );
    }

    #[test]
    fn refinements_apply_placeholder_and_overhead() {
        let estimator = CapacityEstimator::default();
        assert_eq!(estimator.after_audio(1_000_000, 8.0).bytes, 1_500_000);
        assert_eq!(estimator.after_video(1_000_000, 2_000_000).bytes, 3_180_000);
    }

    #[test]
    fn directory_size_is_recursive() {
        let dir = tempfile::tempdir().unwrap();
        write_sized(&dir.path().join("BDMV/STREAM/00000.m2ts"), 1_000);
        write_sized(&dir.path().join("BDMV/index.bdmv"), 24);
        std::fs::create_dir_all(dir.path().join("CERTIFICATE")).unwrap();

        assert_eq!(directory_size(dir.path()).unwrap(), 1_024);
        let estimate = CapacityEstimator::default().final_size(dir.path()).unwrap();
        assert_eq!(estimate.bytes, 1_024);
        assert_eq!(estimate.stage, EstimateStage::Final);
    }

    #[test]
    fn boundary_is_strictly_greater() {
        assert!(check_fits(25_000_000_000, DiscCapacity::Bd25).is_ok());
        match check_fits(25_000_000_001, DiscCapacity::Bd25) {
            Err(BuildError::CapacityExceeded { size, budget }) => {
                assert_eq!(size, 25_000_000_001);
                assert_eq!(budget, 25_000_000_000);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn preflight_reports_folder_size() {
        let dir = tempfile::tempdir().unwrap();
        write_sized(&dir.path().join("BDMV/STREAM/00000.m2ts"), 2_048);
        assert_eq!(preflight(dir.path(), DiscCapacity::Bd25).unwrap(), 2_048);
    }

    #[test]
    fn missing_folder_fails_preflight() {
        let dir = tempfile::tempdir().unwrap();
        assert!(preflight(&dir.path().join("nope"), DiscCapacity::Bd25).is_err());
    }
}
