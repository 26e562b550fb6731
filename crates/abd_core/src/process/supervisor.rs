//! Registry of running tool processes.

use std::collections::HashMap;
use std::io;
use std::process::{Child, ExitStatus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

/// A spawned child owned jointly by the runner and the supervisor.
///
/// Reaping (`try_wait`) and signalling both happen under the same lock, so
/// a signal never reaches a pid that was already reaped and reused.
#[derive(Debug, Clone)]
pub struct SupervisedChild {
    key: u64,
    pid: u32,
    child: Arc<Mutex<Child>>,
}

impl SupervisedChild {
    pub fn id(&self) -> u32 {
        self.pid
    }

    /// Exit status if the child has exited, reaping it.
    pub fn try_wait(&self) -> io::Result<Option<ExitStatus>> {
        self.child.lock().try_wait()
    }

    /// Forcefully kill the child if it is still running.
    pub fn kill(&self) {
        let mut child = self.child.lock();
        if matches!(child.try_wait(), Ok(None)) {
            if let Err(e) = child.kill() {
                tracing::debug!(pid = self.pid, "kill failed: {}", e);
            }
        }
    }

    /// Send `signal` unless the child was already reaped.
    fn signal(&self, signal: Signal) {
        let mut child = self.child.lock();
        if matches!(child.try_wait(), Ok(None)) {
            send(&mut child, signal);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Terminate,
    Interrupt,
}

#[derive(Debug)]
struct LiveProcess {
    handle: SupervisedChild,
    label: String,
}

/// Tracks live external processes so a cancellation can stop them.
///
/// Processes are registered right after spawn and unregistered by the
/// runner once they are reaped. All registry access goes through one mutex.
#[derive(Debug, Default)]
pub struct ProcessSupervisor {
    registry: Mutex<HashMap<u64, LiveProcess>>,
    next_id: AtomicU64,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a spawned child.
    ///
    /// Pipes the caller wants to read must be taken out of `child` first.
    pub fn register(&self, child: Child, label: impl Into<String>) -> SupervisedChild {
        let key = self.next_id.fetch_add(1, Ordering::Relaxed);
        let label = label.into();
        let handle = SupervisedChild {
            key,
            pid: child.id(),
            child: Arc::new(Mutex::new(child)),
        };
        tracing::debug!(pid = handle.pid, label = %label, "registered process");
        self.registry.lock().insert(
            key,
            LiveProcess {
                handle: handle.clone(),
                label,
            },
        );
        handle
    }

    /// Remove a process after it was reaped.
    pub fn unregister(&self, handle: &SupervisedChild) {
        if let Some(process) = self.registry.lock().remove(&handle.key) {
            tracing::debug!(pid = process.handle.pid, label = %process.label, "unregistered process");
        }
    }

    /// Number of processes currently registered.
    pub fn live_count(&self) -> usize {
        self.registry.lock().len()
    }

    /// Pids of registered processes.
    pub fn live_pids(&self) -> Vec<u32> {
        self.registry.lock().values().map(|p| p.handle.pid).collect()
    }

    /// Terminate every registered process and clear the registry.
    ///
    /// Signals are sent from a background thread: a graceful terminate
    /// first, then an interrupt. Returns how many processes were signalled.
    pub fn terminate_all(&self) -> usize {
        let targets: Vec<SupervisedChild> = self
            .registry
            .lock()
            .drain()
            .map(|(_, p)| p.handle)
            .collect();
        let count = targets.len();
        if count == 0 {
            return 0;
        }

        tracing::warn!(count, "terminating running tool processes");
        let spawn = thread::Builder::new()
            .name("abd-terminate".into())
            .spawn(move || {
                for child in &targets {
                    child.signal(Signal::Terminate);
                }
                for child in &targets {
                    child.signal(Signal::Interrupt);
                }
            });
        if let Err(e) = spawn {
            tracing::error!("could not start termination thread: {}", e);
        }

        count
    }
}

#[cfg(unix)]
fn send(child: &mut Child, signal: Signal) {
    use std::process::{Command, Stdio};

    let flag = match signal {
        Signal::Terminate => "-TERM",
        Signal::Interrupt => "-INT",
    };
    let result = Command::new("kill")
        .arg(flag)
        .arg(child.id().to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    if let Err(e) = result {
        tracing::debug!(pid = child.id(), "kill {} failed: {}", flag, e);
    }
}

#[cfg(windows)]
fn send(child: &mut Child, signal: Signal) {
    use std::process::{Command, Stdio};

    let result = match signal {
        Signal::Terminate => Command::new("taskkill")
            .arg("/PID")
            .arg(child.id().to_string())
            .arg("/T")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|_| ()),
        Signal::Interrupt => child.kill(),
    };
    if let Err(e) = result {
        tracing::debug!(pid = child.id(), "terminate failed: {}", e);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Command;
    use std::time::{Duration, Instant};

    fn sleeper() -> Child {
        Command::new("sleep").arg("30").spawn().unwrap()
    }

    fn wait_for_exit(handle: &SupervisedChild) -> ExitStatus {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(status) = handle.try_wait().unwrap() {
                return status;
            }
            assert!(Instant::now() < deadline, "child did not exit");
            thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn register_and_unregister() {
        let supervisor = ProcessSupervisor::new();
        let a = supervisor.register(sleeper(), "ffmpeg");
        let b = supervisor.register(sleeper(), "tsMuxeR");
        assert_ne!(a.key, b.key);
        assert_eq!(supervisor.live_count(), 2);

        supervisor.unregister(&a);
        assert_eq!(supervisor.live_pids(), vec![b.id()]);

        // Unknown keys are ignored
        supervisor.unregister(&a);
        assert_eq!(supervisor.live_count(), 1);

        a.kill();
        b.kill();
        assert!(!wait_for_exit(&a).success());
        assert!(!wait_for_exit(&b).success());
    }

    #[test]
    fn terminate_all_on_empty_registry() {
        let supervisor = ProcessSupervisor::new();
        assert_eq!(supervisor.terminate_all(), 0);
    }

    #[test]
    fn terminate_all_stops_running_process() {
        let supervisor = ProcessSupervisor::new();
        let handle = supervisor.register(sleeper(), "sleep");

        assert_eq!(supervisor.terminate_all(), 1);
        assert_eq!(supervisor.live_count(), 0);

        assert!(!wait_for_exit(&handle).success());
    }

    #[test]
    fn reaped_child_is_not_signalled() {
        let supervisor = ProcessSupervisor::new();
        let handle = supervisor.register(Command::new("true").spawn().unwrap(), "true");
        assert!(wait_for_exit(&handle).success());

        // Still registered, but already reaped: signalling is a no-op
        handle.signal(Signal::Terminate);
        handle.kill();
        assert_eq!(supervisor.terminate_all(), 1);
        assert!(handle.try_wait().unwrap().is_some_and(|s| s.success()));
    }
}
