//! External process supervision.
//!
//! - [`CancelToken`]: cooperative cancellation flag checked at stage,
//!   iteration and spawn boundaries
//! - [`ProcessSupervisor`]: registry of live tool processes with forceful
//!   termination
//! - [`ProcessRunner`]: spawns one tool invocation, registers it, waits for
//!   exit and captures combined output

mod runner;
mod supervisor;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use runner::{augmented_search_path, format_command, ProcessOutput, ProcessRunner};
pub use supervisor::{ProcessSupervisor, SupervisedChild};

/// Shared cancellation flag.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear the flag for the next build.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// `Err(Cancelled)` if cancellation was requested.
    pub fn check(&self) -> crate::error::BuildResult<()> {
        if self.is_cancelled() {
            Err(crate::error::BuildError::Cancelled)
        } else {
            Ok(())
        }
    }
}
