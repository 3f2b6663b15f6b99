//! Capabilities a launched process exposes to the scheduler.

use async_trait::async_trait;
use streamglob_proto::protocol::{Progress, TaskOutcome};

/// Exit status of a supervised process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    /// `None` when the process was ended by a signal.
    pub code: Option<i32>,
    pub success: bool,
}

impl ExitInfo {
    pub fn success() -> Self {
        Self {
            code: Some(0),
            success: true,
        }
    }

    pub fn failure(code: Option<i32>) -> Self {
        Self {
            code,
            success: false,
        }
    }
}

impl From<std::process::ExitStatus> for ExitInfo {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
            success: status.success(),
        }
    }
}

impl From<ExitInfo> for TaskOutcome {
    fn from(exit: ExitInfo) -> Self {
        TaskOutcome::Exited {
            code: exit.code,
            success: exit.success,
        }
    }
}

/// Handle to an external process returned by a [`Launcher`](crate::Launcher).
///
/// All methods are non-blocking; the monitor calls them while holding the
/// roster lock.
pub trait ProcessHandle: Send + Sync {
    fn pid(&self) -> Option<u32>;

    /// `None` while the process is still running.
    fn exit_status(&self) -> Option<ExitInfo>;

    /// Ask the process to end. Exit is observed later through `exit_status`.
    fn terminate(&self);

    /// Progress reporting is optional; handles that support it return
    /// themselves here.
    fn as_progressable(&self) -> Option<&dyn Progressable> {
        None
    }
}

/// Optional capability: a process that can report how far along it is.
#[async_trait]
pub trait Progressable: Send + Sync {
    async fn update_progress(&self) -> anyhow::Result<Progress>;
}
