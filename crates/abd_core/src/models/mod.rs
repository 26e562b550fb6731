//! Data models for Audio Blu-ray Author.
//!
//! - Enums for output codec, LPCM format, disc capacity, video/background modes
//! - Audio items, the editable track list, and the prepared audio result

mod enums;
mod media;

pub use enums::{BackgroundMode, DiscCapacity, LpcmFormat, OutputCodec, VideoMode};
pub use media::{
    extension_of, AudioAttributes, AudioItem, PreparedAudio, TrackList, TrackMetadata,
};
