//! Chapter list from segment durations.

use std::fs;
use std::path::Path;

use super::types::{ChapterMark, ChapterResult};

/// One chapter per segment, starting at the running sum of durations.
///
/// Starts are rounded to milliseconds from the f64 running sum, so
/// rounding errors do not accumulate. The first chapter is always at 0.
pub fn build_chapters(durations: &[f64]) -> Vec<ChapterMark> {
    let mut elapsed = 0.0_f64;
    durations
        .iter()
        .enumerate()
        .map(|(index, duration)| {
            let mark = ChapterMark {
                number: index + 1,
                start_ms: (elapsed * 1000.0).round().max(0.0) as u64,
            };
            elapsed += duration.max(0.0);
            mark
        })
        .collect()
}

/// Chapter file text, one `\n`-terminated line per chapter.
pub fn chapter_text(marks: &[ChapterMark]) -> String {
    marks.iter().map(|m| m.to_line() + "\n").collect()
}

/// Write the chapter file for these durations.
pub fn write_chapter_file(path: &Path, durations: &[f64]) -> ChapterResult<Vec<ChapterMark>> {
    let marks = build_chapters(durations);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, chapter_text(&marks))?;
    Ok(marks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_chapter_at_zero() {
        let marks = build_chapters(&[183.4, 240.0]);
        assert_eq!(chapter_text(&marks), "00:00:00.000 Chapter 01\n00:03:03.400 Chapter 02\n");
    }

    #[test]
    fn starts_are_non_decreasing_and_sum_holds() {
        let durations = [0.3333, 12.0004, 0.0, 7.5, 359.9996, 1.0];
        let marks = build_chapters(&durations);
        assert_eq!(marks[0].start_ms, 0);
        assert!(marks.windows(2).all(|w| w[0].start_ms <= w[1].start_ms));

        let last = marks.last().unwrap().start_ms as f64 + durations.last().unwrap() * 1000.0;
        let total: f64 = durations.iter().sum::<f64>() * 1000.0;
        assert!((last - total).abs() <= 1.0);
    }

    #[test]
    fn numbers_are_two_digit() {
        let marks = build_chapters(&[1.0; 12]);
        assert!(marks[8].to_line().ends_with("Chapter 09"));
        assert!(marks[11].to_line().ends_with("Chapter 12"));
    }

    #[test]
    fn writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chapters.txt");
        let marks = write_chapter_file(&path, &[10.0, 20.0]).unwrap();
        assert_eq!(marks.len(), 2);
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().nth(1), Some("00:00:10.000 Chapter 02"));
    }
}
