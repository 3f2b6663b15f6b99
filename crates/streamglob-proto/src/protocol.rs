use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Caller-supplied keyword options forwarded to a launcher.
pub type TaskOptions = BTreeMap<String, String>;

/// Identity assigned by the task manager at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An executable plus the arguments it is always started with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramSpec {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ProgramSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// `program arg arg…` as one shell-ish string, for helpers that take
    /// the downstream player as a single argument.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Title and source metadata attached by whoever submits a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub title: String,
    pub sources: Vec<String>,
}

impl MediaItem {
    pub fn new(title: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            title: title.into(),
            sources,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskAction {
    Play,
    Download,
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskAction::Play => f.write_str("play"),
            TaskAction::Download => f.write_str("download"),
        }
    }
}

/// Lifecycle: Queued -> Running -> Completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskState {
    #[default]
    Queued,
    Running,
    Completed,
}

/// How a completed task ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TaskOutcome {
    /// The process exited on its own. `code` is `None` when killed by a signal.
    Exited { code: Option<i32>, success: bool },
    /// No process could be started.
    LaunchFailed { reason: String },
    /// Terminated by the task manager (stop or explicit terminate).
    Cancelled,
}

impl TaskOutcome {
    pub fn is_failure(&self) -> bool {
        match self {
            TaskOutcome::Exited { success, .. } => !success,
            TaskOutcome::LaunchFailed { .. } => true,
            TaskOutcome::Cancelled => false,
        }
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Exited { success: true, .. } => f.write_str("done"),
            TaskOutcome::Exited {
                code: Some(code), ..
            } => write!(f, "failed (exit {})", code),
            TaskOutcome::Exited { code: None, .. } => f.write_str("failed (signal)"),
            TaskOutcome::LaunchFailed { reason } => write!(f, "launch failed: {}", reason),
            TaskOutcome::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Progress as last reported by a progressable process. All fields optional
/// since downloaders report very different things.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// 0.0 - 1.0
    pub fraction: Option<f32>,
    /// Bytes written so far.
    pub bytes: Option<u64>,
    pub rate: Option<String>,
    pub eta: Option<String>,
}

/// A display row for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    pub id: TaskId,
    pub action: TaskAction,
    pub title: String,
    pub sources: Vec<String>,
    /// Destination name for downloads.
    pub filename: Option<String>,
    pub state: TaskState,
    pub pid: Option<u32>,
    pub started_at: Option<DateTime<Local>>,
    pub elapsed_ms: u64,
    pub progress: Option<Progress>,
    pub outcome: Option<TaskOutcome>,
    pub details_expanded: bool,
}

/// All queues and rosters at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TasksSnapshot {
    pub to_play: Vec<TaskView>,
    pub to_download: Vec<TaskView>,
    pub playing: Vec<TaskView>,
    pub active: Vec<TaskView>,
    pub done: Vec<TaskView>,
}

impl TasksSnapshot {
    pub fn find(&self, id: TaskId) -> Option<&TaskView> {
        self.to_play
            .iter()
            .chain(&self.to_download)
            .chain(&self.playing)
            .chain(&self.active)
            .chain(&self.done)
            .find(|t| t.id == id)
    }

    pub fn pending_len(&self) -> usize {
        self.to_play.len() + self.to_download.len()
    }

    pub fn running_len(&self) -> usize {
        self.playing.len() + self.active.len()
    }
}

/// Notifications fanned out to display listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum BroadcastMessage {
    /// Rosters changed; receivers should take a fresh snapshot.
    TasksUpdated,
    /// A formatted WARN/ERROR log line.
    Log(String),
}
