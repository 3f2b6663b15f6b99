//! Queues and rosters, and every transition a task goes through.
//!
//! Each method is one complete transition. The manager keeps the board behind
//! a mutex and never holds it across an `.await`, so the worker and poller
//! only ever see tasks before or after a transition, never halfway.

use std::sync::Arc;

use streamglob_proto::protocol::{
    MediaItem, Progress, TaskAction, TaskId, TaskOutcome, TaskState, TasksSnapshot,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::process::ProcessHandle;
use crate::queue::TaskList;
use crate::task::{Task, TaskPayload};

#[derive(Debug, Default)]
pub struct TaskBoard {
    to_play: TaskList,
    to_download: TaskList,
    playing: TaskList,
    active: TaskList,
    done: TaskList,
    current_task_id: u64,
    /// Set by `terminate_all`; nothing is launched or promoted afterwards.
    stopping: bool,
}

/// What one reaping pass removed from the running rosters.
#[derive(Debug, Default, PartialEq)]
pub struct Reaped {
    pub plays: Vec<TaskId>,
    pub downloads: Vec<TaskId>,
}

impl Reaped {
    pub fn is_empty(&self) -> bool {
        self.plays.is_empty() && self.downloads.is_empty()
    }
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next id and append to the queue for the payload's action.
    pub fn submit(&mut self, media: MediaItem, payload: TaskPayload) -> TaskId {
        self.current_task_id += 1;
        let id = TaskId(self.current_task_id);
        let task = Task::new(id, media, payload);
        debug!(task = %id, action = %task.action(), title = %task.media().title, "queued");
        match task.action() {
            TaskAction::Play => self.to_play.push_back(task),
            TaskAction::Download => self.to_download.push_back(task),
        }
        id
    }

    /// Pick the next task to launch.
    ///
    /// Plays always go first and ignore the cap. Downloads leave the queue only
    /// while fewer than `max_concurrent` downloads are running. Both queues are
    /// FIFO. Nothing is handed out once stopping.
    pub fn take_next(&mut self, max_concurrent: usize) -> Option<Task> {
        if self.stopping {
            return None;
        }
        if let Some(task) = self.to_play.pop_front() {
            return Some(task);
        }
        if self.active.len() < max_concurrent {
            return self.to_download.pop_front();
        }
        None
    }

    /// Queued -> Running, into the roster matching the task's action.
    ///
    /// A launch that completes after `terminate_all` is terminated instead and
    /// `false` is returned.
    pub fn promote(
        &mut self,
        mut task: Task,
        process: Arc<dyn ProcessHandle>,
        now: Instant,
    ) -> bool {
        if self.stopping {
            warn!(task = %task.id(), "launched after stop was requested, terminating");
            self.discard_cancelled(task, process, now);
            return false;
        }
        task.start(process, now);
        info!(task = %task.id(), pid = ?task.pid(), action = %task.action(), "running");
        match task.action() {
            TaskAction::Play => self.playing.push_back(task),
            TaskAction::Download => self.active.push_back(task),
        }
        true
    }

    /// A task that never got a process. Kept in `done` whatever its action so
    /// the failure stays visible.
    pub fn fail_launch(&mut self, mut task: Task, reason: String) {
        task.complete(TaskOutcome::LaunchFailed { reason });
        self.done.push_back(task);
    }

    /// A task whose process was started after cancellation was requested.
    fn discard_cancelled(
        &mut self,
        mut task: Task,
        process: Arc<dyn ProcessHandle>,
        now: Instant,
    ) {
        process.terminate();
        task.start(process, now);
        task.terminated = true;
        task.complete(TaskOutcome::Cancelled);
        if task.action() == TaskAction::Download {
            self.done.push_back(task);
        }
    }

    /// Drop exited plays; move exited downloads to `done`.
    pub fn reap(&mut self) -> Reaped {
        let mut reaped = Reaped::default();

        for mut task in self.playing.extract_if(has_exited) {
            let outcome = finish(&mut task);
            debug!(task = %task.id(), %outcome, "play finished");
            reaped.plays.push(task.id());
        }

        let exited = self.active.extract_if(has_exited);
        for mut task in exited {
            let outcome = finish(&mut task);
            if outcome.is_failure() {
                warn!(task = %task.id(), title = %task.media().title, %outcome, "download failed");
            } else {
                info!(task = %task.id(), title = %task.media().title, %outcome, "download finished");
            }
            reaped.downloads.push(task.id());
            self.done.push_back(task);
        }

        reaped
    }

    /// Refresh elapsed time of running downloads and return the handles that
    /// can report progress.
    pub fn tick_active(&mut self, now: Instant) -> Vec<(TaskId, Arc<dyn ProcessHandle>)> {
        let mut progressable = Vec::new();
        for task in self.active.iter_mut() {
            task.tick(now);
            if let Some(process) = task.process.as_ref() {
                if process.as_progressable().is_some() {
                    progressable.push((task.id(), Arc::clone(process)));
                }
            }
        }
        progressable
    }

    /// Ignored if the task left the running roster in the meantime.
    pub fn set_progress(&mut self, id: TaskId, progress: Progress) {
        if let Some(task) = self.active.get_mut(id) {
            task.progress = Some(progress);
        }
    }

    /// Terminate every running process, empty both running rosters and refuse
    /// any later launch. Returns how many processes were asked to end.
    pub fn terminate_all(&mut self) -> usize {
        self.stopping = true;
        let mut count = 0;
        for task in self.playing.drain() {
            if let Some(process) = task.process.as_ref() {
                process.terminate();
                count += 1;
            }
        }
        let stopped: Vec<Task> = self.active.drain().collect();
        for mut task in stopped {
            if let Some(process) = task.process.as_ref() {
                process.terminate();
                count += 1;
            }
            task.terminated = true;
            task.complete(TaskOutcome::Cancelled);
            self.done.push_back(task);
        }
        count
    }

    /// Ask one running task's process to end; the next reap collects it.
    pub fn terminate(&mut self, id: TaskId) -> bool {
        let task = match self.playing.get_mut(id) {
            Some(task) => task,
            None => match self.active.get_mut(id) {
                Some(task) => task,
                None => return false,
            },
        };
        let Some(process) = task.process.clone() else {
            return false;
        };
        process.terminate();
        task.terminated = true;
        true
    }

    pub fn remove_pending(&mut self, id: TaskId) -> Option<Task> {
        self.to_play
            .remove_by_id(id)
            .or_else(|| self.to_download.remove_by_id(id))
    }

    /// Flip the display-only details flag wherever the task currently lives.
    pub fn toggle_details(&mut self, id: TaskId) -> Option<bool> {
        let task = self
            .to_play
            .get_mut(id)
            .or_else(|| self.to_download.get_mut(id))
            .or_else(|| self.playing.get_mut(id))
            .or_else(|| self.active.get_mut(id))
            .or_else(|| self.done.get_mut(id))?;
        task.details_expanded = !task.details_expanded;
        Some(task.details_expanded)
    }

    pub fn clear_completed(&mut self) -> usize {
        let n = self.done.len();
        self.done.drain().for_each(drop);
        n
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    pub fn running_downloads(&self) -> usize {
        self.active.len()
    }

    pub fn running_plays(&self) -> usize {
        self.playing.len()
    }

    pub fn pending(&self) -> usize {
        self.to_play.len() + self.to_download.len()
    }

    pub fn to_play(&self) -> &TaskList {
        &self.to_play
    }

    pub fn to_download(&self) -> &TaskList {
        &self.to_download
    }

    pub fn playing(&self) -> &TaskList {
        &self.playing
    }

    pub fn active(&self) -> &TaskList {
        &self.active
    }

    pub fn done(&self) -> &TaskList {
        &self.done
    }

    pub fn snapshot(&self) -> TasksSnapshot {
        TasksSnapshot {
            to_play: self.to_play.views(),
            to_download: self.to_download.views(),
            playing: self.playing.views(),
            active: self.active.views(),
            done: self.done.views(),
        }
    }
}

fn has_exited(task: &Task) -> bool {
    task.state == TaskState::Running
        && task
            .process
            .as_ref()
            .map_or(true, |p| p.exit_status().is_some())
}

fn finish(task: &mut Task) -> TaskOutcome {
    let outcome = if task.terminated {
        TaskOutcome::Cancelled
    } else {
        match task.process.as_ref().and_then(|p| p.exit_status()) {
            Some(exit) => exit.into(),
            None => TaskOutcome::Exited {
                code: None,
                success: false,
            },
        }
    };
    task.complete(outcome.clone());
    outcome
}
