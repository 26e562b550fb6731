//! Chapter types and error definitions.

use serde::{Deserialize, Serialize};

use crate::error::BuildError;

/// One chapter mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterMark {
    /// 1-based chapter number.
    pub number: usize,
    /// Start time in milliseconds.
    pub start_ms: u64,
}

impl ChapterMark {
    /// Chapter file line: `HH:MM:SS.mmm Chapter NN`.
    pub fn to_line(&self) -> String {
        format!(
            "{} Chapter {:02}",
            format_timestamp_ms(self.start_ms),
            self.number
        )
    }

    /// Start rounded to whole seconds (500 ms and above round up).
    pub fn start_secs_rounded(&self) -> u64 {
        (self.start_ms + 500) / 1000
    }
}

/// Error types for chapter operations.
#[derive(Debug, thiserror::Error)]
pub enum ChapterError {
    /// A line does not follow `HH:MM:SS.mmm Chapter NN`.
    #[error("Malformed chapter line {line}: '{text}'")]
    MalformedLine { line: usize, text: String },

    /// No chapter lines were found.
    #[error("No chapters found")]
    NoChapters,

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Type alias for chapter operation results.
pub type ChapterResult<T> = Result<T, ChapterError>;

impl From<ChapterError> for BuildError {
    fn from(err: ChapterError) -> Self {
        match err {
            ChapterError::IoError(source) => BuildError::io("chapter file", source),
            other => BuildError::custom(other.to_string()),
        }
    }
}

/// Format milliseconds as `HH:MM:SS.mmm`.
pub fn format_timestamp_ms(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60,
        ms % 1000
    )
}

/// Format whole seconds as `HH:MM:SS`.
pub fn format_hms(secs: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

/// Parse `HH:MM:SS.mmm` (fraction optional, any number of digits).
pub fn parse_timestamp_ms(text: &str) -> Option<u64> {
    let (hms, fraction) = match text.split_once('.') {
        Some((hms, fraction)) => (hms, fraction),
        None => (text, ""),
    };

    let mut parts = hms.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
        return None;
    }

    let millis = if fraction.is_empty() {
        0
    } else {
        if !fraction.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        // First three digits, right-padded
        let padded = format!("{:0<3}", &fraction[..fraction.len().min(3)]);
        padded.parse::<u64>().ok()?
    };

    Some(((hours * 60 + minutes) * 60 + seconds) * 1000 + millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_timestamps() {
        assert_eq!(format_timestamp_ms(0), "00:00:00.000");
        assert_eq!(format_timestamp_ms(3_723_456), "01:02:03.456");
        assert_eq!(format_hms(3_723), "01:02:03");
    }

    #[test]
    fn parses_timestamps() {
        assert_eq!(parse_timestamp_ms("01:02:03.456"), Some(3_723_456));
        assert_eq!(parse_timestamp_ms("00:00:01.5"), Some(1_500));
        assert_eq!(parse_timestamp_ms("00:00:07"), Some(7_000));
        assert_eq!(parse_timestamp_ms("00:61:00.000"), None);
        assert_eq!(parse_timestamp_ms("garbage"), None);
    }

    #[test]
    fn half_second_rounds_up() {
        let mark = ChapterMark {
            number: 2,
            start_ms: 500,
        };
        assert_eq!(mark.start_secs_rounded(), 1);
        let mark = ChapterMark {
            number: 2,
            start_ms: 1_499,
        };
        assert_eq!(mark.start_secs_rounded(), 1);
    }

    #[test]
    fn line_format() {
        let mark = ChapterMark {
            number: 3,
            start_ms: 61_250,
        };
        assert_eq!(mark.to_line(), "00:01:01.250 Chapter 03");
    }
}
