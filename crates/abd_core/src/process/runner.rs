//! Running one external tool invocation under supervision.

use std::ffi::{OsStr, OsString};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::{CancelToken, ProcessSupervisor, SupervisedChild};
use crate::error::{BuildError, BuildResult};
use crate::logging::BuildLogger;

/// Install prefixes added to the search path of every invocation.
#[cfg(target_os = "macos")]
const COMMON_PREFIXES: &[&str] = &["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin", "/bin"];
#[cfg(all(unix, not(target_os = "macos")))]
const COMMON_PREFIXES: &[&str] = &["/usr/local/bin", "/usr/bin", "/bin", "/snap/bin"];
#[cfg(windows)]
const COMMON_PREFIXES: &[&str] = &[];

/// Interval between exit checks of a running child.
const WAIT_POLL: Duration = Duration::from_millis(20);

/// Captured result of a finished process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Exit code (-1 when killed by a signal).
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout followed by stderr.
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (true, _) => self.stderr.clone(),
            (false, true) => self.stdout.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }
}

/// Search path with tool directories and common prefixes in front.
///
/// Returns `None` when nothing could be joined (e.g. a directory containing
/// the platform separator).
pub fn augmented_search_path(tool_dirs: &[PathBuf]) -> Option<OsString> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    for dir in tool_dirs
        .iter()
        .cloned()
        .chain(COMMON_PREFIXES.iter().map(PathBuf::from))
    {
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    if let Some(existing) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&existing) {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
    }
    std::env::join_paths(dirs).ok()
}

/// Shell-like rendering of a command for the log.
pub fn format_command(program: &Path, args: &[OsString]) -> String {
    let mut parts = vec![quote(program.as_os_str())];
    parts.extend(args.iter().map(|a| quote(a)));
    parts.join(" ")
}

fn quote(arg: &OsStr) -> String {
    let s = arg.to_string_lossy();
    if s.is_empty() || s.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"') {
        format!("'{}'", s.replace('\'', "'\\''"))
    } else {
        s.to_string()
    }
}

/// Poll until the child is reaped.
///
/// The supervisor may signal the child meanwhile, so the handle lock is
/// only held for each `try_wait`.
fn wait_reaped(handle: &SupervisedChild) -> io::Result<ExitStatus> {
    loop {
        if let Some(status) = handle.try_wait()? {
            return Ok(status);
        }
        thread::sleep(WAIT_POLL);
    }
}

/// Spawns tool invocations for one build.
///
/// Every spawn checks the cancel token first, so nothing starts once a
/// cancellation was requested.
#[derive(Clone)]
pub struct ProcessRunner {
    supervisor: Arc<ProcessSupervisor>,
    cancel: CancelToken,
    search_path: Option<OsString>,
    logger: Option<Arc<BuildLogger>>,
}

impl ProcessRunner {
    pub fn new(supervisor: Arc<ProcessSupervisor>, cancel: CancelToken) -> Self {
        Self {
            supervisor,
            cancel,
            search_path: None,
            logger: None,
        }
    }

    /// Run with an augmented `PATH` including these tool directories.
    pub fn with_tool_dirs(mut self, dirs: &[PathBuf]) -> Self {
        self.search_path = augmented_search_path(dirs);
        self
    }

    /// Log command lines and tool output to a build logger.
    pub fn with_logger(mut self, logger: Arc<BuildLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn supervisor(&self) -> &Arc<ProcessSupervisor> {
        &self.supervisor
    }

    /// Run a process to completion and capture its output.
    ///
    /// Any exit code is returned as-is; only cancellation and spawn/wait
    /// failures are errors.
    pub fn run<I, S>(&self, label: &str, program: &Path, args: I) -> BuildResult<ProcessOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.cancel.check()?;

        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let rendered = format_command(program, &args);
        match &self.logger {
            Some(logger) => logger.command(&rendered),
            None => tracing::debug!("$ {}", rendered),
        }

        let mut cmd = Command::new(program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(path) = &self.search_path {
            cmd.env("PATH", path);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| BuildError::io(format!("spawning {}", label), e))?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let handle = self.supervisor.register(child, label);

        // Cancelled between the check and the registration
        if self.cancel.is_cancelled() {
            handle.kill();
            let _ = wait_reaped(&handle);
            self.supervisor.unregister(&handle);
            return Err(BuildError::Cancelled);
        }

        let stderr_reader = stderr.map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf);
                buf
            })
        });

        let mut stdout_buf = Vec::new();
        if let Some(mut stdout) = stdout {
            let _ = stdout.read_to_end(&mut stdout_buf);
        }

        let status = wait_reaped(&handle);
        self.supervisor.unregister(&handle);
        let status = status.map_err(|e| BuildError::io(format!("waiting for {}", label), e))?;

        let stderr_buf = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        let output = ProcessOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&stdout_buf).to_string(),
            stderr: String::from_utf8_lossy(&stderr_buf).to_string(),
        };

        if let Some(logger) = &self.logger {
            for line in output.stdout.lines() {
                logger.output_line(line, false);
            }
            for line in output.stderr.lines() {
                logger.output_line(line, true);
            }
        }

        if self.cancel.is_cancelled() {
            return Err(BuildError::Cancelled);
        }

        Ok(output)
    }

    /// Run a process and fail with `CommandFailed` on a non-zero exit.
    pub fn run_checked<I, S>(
        &self,
        label: &str,
        program: &Path,
        args: I,
    ) -> BuildResult<ProcessOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self.run(label, program, args)?;
        if !output.success() {
            if let Some(logger) = &self.logger {
                logger.show_tail(label);
            }
            return Err(BuildError::command_failed(
                label,
                output.exit_code,
                output.combined(),
            ));
        }
        Ok(output)
    }
}
