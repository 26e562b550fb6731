//! Per-build logger with file and callback output.
//!
//! Each build gets its own logger that:
//! - Writes to a dedicated log file
//! - Forwards every line to a callback (CLI output, session log)
//! - Supports compact mode with progress filtering
//! - Keeps a tail of external tool output for failure diagnosis

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

/// Per-build logger with dual output (file + callback).
pub struct BuildLogger {
    build_name: String,
    log_path: PathBuf,
    file_writer: Mutex<Option<BufWriter<File>>>,
    callback: Mutex<Option<LogCallback>>,
    config: LogConfig,
    /// Recent tool output lines.
    tail_buffer: Mutex<VecDeque<String>>,
    /// Last progress value logged (compact mode).
    last_progress: Mutex<Option<u32>>,
}

impl BuildLogger {
    /// Create a logger writing `<log_dir>/<build_name>.log`.
    pub fn new(
        build_name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> std::io::Result<Self> {
        let build_name = build_name.into();
        let log_dir = log_dir.as_ref();

        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", sanitize_filename(&build_name)));
        let file = File::create(&log_path)?;

        Ok(Self {
            build_name,
            log_path,
            file_writer: Mutex::new(Some(BufWriter::new(file))),
            callback: Mutex::new(callback),
            config,
            tail_buffer: Mutex::new(VecDeque::with_capacity(64)),
            last_progress: Mutex::new(None),
        })
    }

    /// Logger that only forwards to a callback (no file).
    pub fn callback_only(
        build_name: impl Into<String>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> Self {
        Self {
            build_name: build_name.into(),
            log_path: PathBuf::new(),
            file_writer: Mutex::new(None),
            callback: Mutex::new(callback),
            config,
            tail_buffer: Mutex::new(VecDeque::with_capacity(64)),
            last_progress: Mutex::new(None),
        }
    }

    pub fn build_name(&self) -> &str {
        &self.build_name
    }

    /// Log file path (empty for callback-only loggers).
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }

        let formatted = self.format_message(message);
        self.output(&formatted);
    }

    pub fn info(&self, message: &str) {
        tracing::info!(build = %self.build_name, "{}", message);
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!(build = %self.build_name, "{}", message);
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(build = %self.build_name, "{}", message);
        self.log(LogLevel::Warn, &MessagePrefix::Warning.format(message));
    }

    pub fn error(&self, message: &str) {
        tracing::error!(build = %self.build_name, "{}", message);
        self.log(LogLevel::Error, &MessagePrefix::Error.format(message));
    }

    /// Log an external command line.
    pub fn command(&self, command: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Command.format(command));
    }

    /// Log a phase marker.
    pub fn phase(&self, phase_name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Phase.format(phase_name));
    }

    /// Log a section marker.
    pub fn section(&self, section_name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Section.format(section_name));
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Success.format(message));
    }

    /// Log progress (filtered to step intervals in compact mode).
    ///
    /// Returns true if the line was written.
    pub fn progress(&self, percent: u32) -> bool {
        if self.config.compact {
            let mut last = self.last_progress.lock();
            let step = self.config.progress_step.max(1);
            let current_step = percent / step;

            if let Some(prev) = *last {
                if current_step <= prev / step && percent < 100 {
                    return false;
                }
            }
            *last = Some(percent);
        }

        self.log(LogLevel::Info, &format!("Progress: {}%", percent));
        true
    }

    /// Record a line of external tool output.
    ///
    /// Always kept in the tail buffer; written out only in verbose mode.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        {
            let mut buffer = self.tail_buffer.lock();
            if self.config.error_tail > 0 && buffer.len() >= self.config.error_tail {
                buffer.pop_front();
            }
            if self.config.error_tail > 0 {
                buffer.push_back(line.to_string());
            }
        }

        if self.config.compact {
            return;
        }

        let prefix = if is_stderr { "[stderr] " } else { "" };
        self.output(&self.format_message(&format!("{}{}", prefix, line)));
    }

    /// Write the tail buffer (after a failure).
    pub fn show_tail(&self, header: &str) {
        let buffer = self.tail_buffer.lock();
        if buffer.is_empty() {
            return;
        }

        self.output(&self.format_message(&format!("[{}/tail]", header)));
        for line in buffer.iter() {
            self.output(&self.format_message(line));
        }
    }

    /// Forget buffered tool output (at the start of each step).
    pub fn clear_tail(&self) {
        self.tail_buffer.lock().clear();
    }

    /// Write a generated text file (descriptor, chapter list) into the log.
    pub fn file_contents(&self, title: &str, contents: &str) {
        self.section(title);
        for line in contents.lines() {
            self.log(LogLevel::Info, line);
        }
        self.log(LogLevel::Info, &"-".repeat(title.len() + 8));
    }

    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Close the log file. Callback output keeps working.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }

    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }

        if let Some(ref callback) = *self.callback.lock() {
            callback(formatted);
        }
    }
}

impl Drop for BuildLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Make a string safe to use as a filename.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn quiet_config() -> LogConfig {
        LogConfig {
            show_timestamps: false,
            ..Default::default()
        }
    }

    #[test]
    fn creates_log_file() {
        let dir = tempdir().unwrap();
        let logger = BuildLogger::new("build_1", dir.path(), quiet_config(), None).unwrap();

        assert!(logger.log_path().exists());
        assert!(logger.log_path().ends_with("build_1.log"));
    }

    #[test]
    fn writes_prefixed_lines_to_file() {
        let dir = tempdir().unwrap();
        let logger = BuildLogger::new("build", dir.path(), quiet_config(), None).unwrap();

        logger.phase("Audio");
        logger.command("ffmpeg -i a.flac");
        logger.error("tsMuxeR failed");
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("=== Audio ==="));
        assert!(content.contains("$ ffmpeg -i a.flac"));
        assert!(content.contains("[ERROR] tsMuxeR failed"));
    }

    #[test]
    fn forwards_to_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let callback: LogCallback = Box::new(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let logger = BuildLogger::callback_only("build", quiet_config(), Some(callback));
        logger.info("one");
        logger.success("two");

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn compact_mode_filters_progress() {
        let logger = BuildLogger::callback_only(
            "build",
            LogConfig {
                progress_step: 20,
                ..quiet_config()
            },
            None,
        );

        assert!(logger.progress(0));
        assert!(!logger.progress(5));
        assert!(!logger.progress(15));
        assert!(logger.progress(20));
        assert!(!logger.progress(25));
        assert!(logger.progress(40));
        assert!(logger.progress(100));
    }

    #[test]
    fn tail_buffer_keeps_latest_lines() {
        let lines = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let logger = BuildLogger::callback_only(
            "build",
            LogConfig {
                error_tail: 3,
                ..quiet_config()
            },
            Some(Box::new(move |line: &str| sink.lock().push(line.to_string()))),
        );

        for line in ["a", "b", "c", "d", "e"] {
            logger.output_line(line, true);
        }
        // Compact mode keeps tool output out of the log until a failure
        assert!(lines.lock().is_empty());

        logger.show_tail("ffmpeg");
        assert_eq!(*lines.lock(), vec!["[ffmpeg/tail]", "c", "d", "e"]);

        lines.lock().clear();
        logger.clear_tail();
        logger.show_tail("ffmpeg");
        assert!(lines.lock().is_empty());
    }

    #[test]
    fn sanitizes_filename() {
        assert_eq!(sanitize_filename("build_2024"), "build_2024");
        assert_eq!(sanitize_filename("a/b:c"), "a_b_c");
    }
}
