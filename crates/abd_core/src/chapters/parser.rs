//! Reading chapter files back.

use std::path::Path;

use super::types::{parse_timestamp_ms, ChapterError, ChapterMark, ChapterResult};

/// Parse a chapter file.
pub fn parse_chapter_file(path: &Path) -> ChapterResult<Vec<ChapterMark>> {
    let content = std::fs::read_to_string(path)?;
    parse_chapter_text(&content)
}

/// Parse `HH:MM:SS.mmm Chapter NN` lines. Blank lines are skipped.
pub fn parse_chapter_text(text: &str) -> ChapterResult<Vec<ChapterMark>> {
    let mut marks = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let malformed = || ChapterError::MalformedLine {
            line: index + 1,
            text: line.to_string(),
        };

        let (timestamp, label) = line.split_once(char::is_whitespace).ok_or_else(malformed)?;
        let start_ms = parse_timestamp_ms(timestamp).ok_or_else(malformed)?;
        let number = label
            .trim()
            .strip_prefix("Chapter")
            .and_then(|n| n.trim().parse::<usize>().ok())
            .ok_or_else(malformed)?;

        marks.push(ChapterMark { number, start_ms });
    }

    if marks.is_empty() {
        return Err(ChapterError::NoChapters);
    }
    Ok(marks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chapters::writer::{build_chapters, chapter_text};

    #[test]
    fn reads_written_chapters() {
        let marks = build_chapters(&[61.25, 30.0, 5.5]);
        assert_eq!(parse_chapter_text(&chapter_text(&marks)).unwrap(), marks);
    }

    #[test]
    fn rejects_bad_lines() {
        let err = parse_chapter_text("00:00:00.000 Chapter 01\nnonsense\n").unwrap_err();
        assert!(matches!(err, ChapterError::MalformedLine { line: 2, .. }));
        assert!(matches!(parse_chapter_text("\n\n"), Err(ChapterError::NoChapters)));
    }
}
