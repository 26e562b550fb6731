//! Chapter marks for the disc.
//!
//! One chapter per track, written as `HH:MM:SS.mmm Chapter NN` lines. The
//! mux descriptor reads the file back and rounds the starts to seconds.

mod parser;
mod types;
mod writer;

pub use parser::{parse_chapter_file, parse_chapter_text};
pub use types::{
    format_hms, format_timestamp_ms, parse_timestamp_ms, ChapterError, ChapterMark, ChapterResult,
};
pub use writer::{build_chapters, chapter_text, write_chapter_file};
