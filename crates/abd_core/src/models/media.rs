//! Audio items, the track list, and prepared stream results.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::enums::OutputCodec;

static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(1);

/// Attributes read from the prober.
///
/// Fields stay `None` when the prober did not report them (or reported
/// something unparseable).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioAttributes {
    /// Container duration in seconds.
    pub duration_secs: Option<f64>,
    /// Sample rate in Hz.
    pub sample_rate: Option<u32>,
    /// Bits per sample.
    pub bit_depth: Option<u8>,
    /// Channel count.
    pub channels: Option<u8>,
    /// ffprobe codec name (e.g. "flac", "truehd").
    pub codec_name: Option<String>,
}

/// One imported audio track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioItem {
    /// Unique identifier within this process.
    pub id: u64,
    /// Source file.
    pub path: PathBuf,
    /// Name shown to the user (file stem by default).
    pub display_name: String,
    /// Probed attributes, filled after probing.
    #[serde(default)]
    pub attributes: AudioAttributes,
}

impl AudioItem {
    /// Create an unprobed item for a file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            id: NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed),
            path,
            display_name,
            attributes: AudioAttributes::default(),
        }
    }

    /// Attach probed attributes.
    pub fn with_attributes(mut self, attributes: AudioAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Probed duration, if known and positive.
    pub fn duration_secs(&self) -> Option<f64> {
        self.attributes.duration_secs.filter(|d| *d > 0.0)
    }

    /// Lowercased file extension.
    pub fn extension(&self) -> String {
        extension_of(&self.path)
    }

    /// Lowercased codec name (empty when unknown).
    pub fn codec_name(&self) -> String {
        self.attributes
            .codec_name
            .as_deref()
            .unwrap_or("")
            .to_ascii_lowercase()
    }

    /// Whether the probe filled in anything.
    pub fn is_probed(&self) -> bool {
        self.attributes != AudioAttributes::default()
    }
}

/// Lowercased extension of a path ("" when none).
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Ordered, user-editable list of tracks.
///
/// The pipeline takes a snapshot with [`TrackList::snapshot`]; edits after
/// that point do not affect a running build.
#[derive(Debug, Clone, Default)]
pub struct TrackList {
    items: Vec<AudioItem>,
}

impl TrackList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: AudioItem) {
        self.items.push(item);
    }

    /// Remove an item by id. Returns the removed item.
    pub fn remove(&mut self, id: u64) -> Option<AudioItem> {
        let idx = self.items.iter().position(|i| i.id == id)?;
        Some(self.items.remove(idx))
    }

    /// Move an item from one position to another.
    ///
    /// Out-of-range indices are ignored.
    pub fn move_item(&mut self, from: usize, to: usize) {
        if from >= self.items.len() || to >= self.items.len() || from == to {
            return;
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
    }

    pub fn items(&self) -> &[AudioItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Owned copy of the current order for a build.
    pub fn snapshot(&self) -> Vec<AudioItem> {
        self.items.clone()
    }

    /// Sum of known durations in seconds.
    pub fn total_duration_secs(&self) -> f64 {
        self.items.iter().filter_map(|i| i.duration_secs()).sum()
    }
}

impl FromIterator<AudioItem> for TrackList {
    fn from_iter<T: IntoIterator<Item = AudioItem>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// Descriptive tags used on rendered frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track_number: Option<u32>,
    /// Embedded front cover image bytes.
    pub cover: Option<Vec<u8>>,
}

impl TrackMetadata {
    /// Placeholder metadata for track `number` (1-based).
    pub fn placeholder(number: usize) -> Self {
        Self {
            title: format!("Track {number}"),
            ..Default::default()
        }
    }
}

/// The single continuous audio stream produced for a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedAudio {
    /// Path to the joined/passed-through stream.
    pub path: PathBuf,
    /// Codec that decides the mux token.
    pub codec: OutputCodec,
    /// Per-track durations in seconds, in track order.
    pub segment_durations: Vec<f64>,
    /// Total duration in seconds.
    pub total_duration: f64,
}

impl PreparedAudio {
    /// Build a result whose total is the sum of its segments.
    pub fn new(path: PathBuf, codec: OutputCodec, segment_durations: Vec<f64>) -> Self {
        let total_duration = segment_durations.iter().sum();
        Self {
            path,
            codec,
            segment_durations,
            total_duration,
        }
    }

    /// Multiplexer audio-type token.
    pub fn mux_token(&self) -> &'static str {
        self.codec.mux_token()
    }
}
