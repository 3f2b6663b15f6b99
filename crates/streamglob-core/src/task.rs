use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use streamglob_proto::protocol::{
    MediaItem, ProgramSpec, Progress, TaskAction, TaskId, TaskOptions, TaskOutcome, TaskState,
    TaskView,
};
use tokio::time::Instant;

use crate::process::ProcessHandle;

#[derive(Debug, Clone, PartialEq)]
pub struct PlayPayload {
    pub player: ProgramSpec,
    /// Program that resolves the stream and feeds it to the player.
    pub helper: Option<ProgramSpec>,
    pub options: TaskOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadPayload {
    /// Destination, relative to the downloader's output directory unless absolute.
    pub filename: String,
    pub helper: Option<ProgramSpec>,
    pub options: TaskOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskPayload {
    Play(PlayPayload),
    Download(DownloadPayload),
}

impl TaskPayload {
    pub fn action(&self) -> TaskAction {
        match self {
            TaskPayload::Play(_) => TaskAction::Play,
            TaskPayload::Download(_) => TaskAction::Download,
        }
    }
}

/// One scheduled play or download.
///
/// Only the task manager creates tasks, so identity, state and the process
/// handle can't be set by whoever submits the work.
pub struct Task {
    id: TaskId,
    media: MediaItem,
    payload: TaskPayload,
    pub(crate) state: TaskState,
    pub(crate) process: Option<Arc<dyn ProcessHandle>>,
    pub(crate) pid: Option<u32>,
    pub(crate) started_at: Option<Instant>,
    pub(crate) started_wall: Option<DateTime<Local>>,
    pub(crate) elapsed: Duration,
    pub(crate) progress: Option<Progress>,
    pub(crate) outcome: Option<TaskOutcome>,
    /// Set when termination was requested, so the exit reads as cancelled.
    pub(crate) terminated: bool,
    pub details_expanded: bool,
}

impl Task {
    pub(crate) fn new(id: TaskId, media: MediaItem, payload: TaskPayload) -> Self {
        let details_expanded = matches!(payload, TaskPayload::Play(_));
        Self {
            id,
            media,
            payload,
            state: TaskState::Queued,
            process: None,
            pid: None,
            started_at: None,
            started_wall: None,
            elapsed: Duration::ZERO,
            progress: None,
            outcome: None,
            terminated: false,
            details_expanded,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn action(&self) -> TaskAction {
        self.payload.action()
    }

    pub fn media(&self) -> &MediaItem {
        &self.media
    }

    pub fn payload(&self) -> &TaskPayload {
        &self.payload
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn process(&self) -> Option<&Arc<dyn ProcessHandle>> {
        self.process.as_ref()
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn progress(&self) -> Option<&Progress> {
        self.progress.as_ref()
    }

    pub fn outcome(&self) -> Option<&TaskOutcome> {
        self.outcome.as_ref()
    }

    /// Queued -> Running. The handle is set exactly once.
    pub(crate) fn start(&mut self, process: Arc<dyn ProcessHandle>, now: Instant) {
        debug_assert!(self.process.is_none(), "task {} started twice", self.id);
        self.pid = process.pid();
        self.process = Some(process);
        self.started_at = Some(now);
        self.started_wall = Some(Local::now());
        self.elapsed = Duration::ZERO;
        self.state = TaskState::Running;
    }

    /// Recompute elapsed time; never moves backwards.
    pub(crate) fn tick(&mut self, now: Instant) {
        if let Some(started) = self.started_at {
            self.elapsed = self.elapsed.max(now.saturating_duration_since(started));
        }
    }

    pub(crate) fn complete(&mut self, outcome: TaskOutcome) {
        self.state = TaskState::Completed;
        self.outcome = Some(outcome);
    }

    pub fn view(&self) -> TaskView {
        let filename = match &self.payload {
            TaskPayload::Download(d) => Some(d.filename.clone()),
            TaskPayload::Play(_) => None,
        };
        TaskView {
            id: self.id,
            action: self.action(),
            title: self.media.title.clone(),
            sources: self.media.sources.clone(),
            filename,
            state: self.state,
            pid: self.pid,
            started_at: self.started_wall,
            elapsed_ms: u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX),
            progress: self.progress.clone(),
            outcome: self.outcome.clone(),
            details_expanded: self.details_expanded,
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("action", &self.action())
            .field("title", &self.media.title)
            .field("state", &self.state)
            .field("pid", &self.pid)
            .field("elapsed", &self.elapsed)
            .field("outcome", &self.outcome)
            .finish()
    }
}
