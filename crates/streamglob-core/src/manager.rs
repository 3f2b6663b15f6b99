//! TaskManager: owns the queues and rosters and runs the worker and poller.
//!
//! The manager is an ordinary value: build one, share it by `Arc` with
//! whatever submits or displays tasks, and drive it with
//! `start()` / `stop()` / `join()`.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use streamglob_proto::config::TasksConfig;
use streamglob_proto::protocol::{MediaItem, ProgramSpec, TaskId, TaskOptions, TasksSnapshot};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::board::TaskBoard;
use crate::error::ManagerError;
use crate::launcher::Launcher;
use crate::refresh::RefreshSink;
use crate::task::{DownloadPayload, PlayPayload, Task, TaskPayload};
use crate::{poller, worker};

/// State shared by the manager and both loops.
pub(crate) struct Shared {
    board: Mutex<TaskBoard>,
    pub(crate) launcher: Arc<dyn Launcher>,
    pub(crate) sink: Arc<dyn RefreshSink>,
    /// Wakes an idle worker on submission and when a download slot frees up.
    pub(crate) wake: Notify,
    pub(crate) max_concurrent: usize,
    pub(crate) interval: Duration,
}

impl Shared {
    /// Never hold the guard across an `.await`.
    pub(crate) fn board(&self) -> MutexGuard<'_, TaskBoard> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `None` until both loops have finished, then how they finished.
type Finished = Option<Result<(), ManagerError>>;

pub struct TaskManager {
    shared: Arc<Shared>,
    /// Present once started.
    cancel: Mutex<Option<CancellationToken>>,
    finished: Arc<watch::Sender<Finished>>,
}

impl TaskManager {
    pub fn new(
        config: &TasksConfig,
        launcher: Arc<dyn Launcher>,
        sink: Arc<dyn RefreshSink>,
    ) -> Self {
        let (finished, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                board: Mutex::new(TaskBoard::new()),
                launcher,
                sink,
                wake: Notify::new(),
                max_concurrent: config.max_concurrent_tasks(),
                interval: config.poll_interval(),
            }),
            cancel: Mutex::new(None),
            finished: Arc::new(finished),
        }
    }

    pub fn max_concurrent_tasks(&self) -> usize {
        self.shared.max_concurrent
    }

    pub fn poll_interval(&self) -> Duration {
        self.shared.interval
    }

    /// Queue a play. Plays are launched ahead of any queued download.
    pub fn play(
        &self,
        media: MediaItem,
        player: ProgramSpec,
        helper: Option<ProgramSpec>,
        options: TaskOptions,
    ) -> TaskId {
        self.submit(
            media,
            TaskPayload::Play(PlayPayload {
                player,
                helper,
                options,
            }),
        )
    }

    /// Queue a download to `filename`.
    pub fn download(
        &self,
        media: MediaItem,
        filename: impl Into<String>,
        helper: Option<ProgramSpec>,
        options: TaskOptions,
    ) -> TaskId {
        self.submit(
            media,
            TaskPayload::Download(DownloadPayload {
                filename: filename.into(),
                helper,
                options,
            }),
        )
    }

    fn submit(&self, media: MediaItem, payload: TaskPayload) -> TaskId {
        let id = self.shared.board().submit(media, payload);
        self.shared.wake.notify_one();
        id
    }

    /// Spawn the worker and poller onto the current tokio runtime.
    /// Calling it again is a no-op.
    pub fn start(&self) {
        let mut cancel_slot = self.token();
        if cancel_slot.is_some() {
            debug!("task_manager already started");
            return;
        }

        info!(
            max_concurrent = self.shared.max_concurrent,
            interval = ?self.shared.interval,
            "task_manager starting"
        );
        let cancel = CancellationToken::new();
        let worker = tokio::spawn(worker::run(Arc::clone(&self.shared), cancel.clone()));
        let poller = tokio::spawn(poller::run(Arc::clone(&self.shared), cancel.clone()));
        tokio::spawn(supervise(worker, poller, Arc::clone(&self.finished)));
        *cancel_slot = Some(cancel);
    }

    /// Terminate every running play and download, then ask both loops to
    /// finish. The loops notice at their next sleep or progress await.
    /// No-op if not running.
    pub fn stop(&self) {
        let cancel = self.token();
        let Some(cancel) = cancel.as_ref() else {
            return;
        };
        if cancel.is_cancelled() {
            return;
        }

        info!("task_manager stopping");
        let terminated = self.shared.board().terminate_all();
        debug!(terminated, "terminated running processes");
        cancel.cancel();
        self.shared.sink.refresh();
    }

    pub fn is_running(&self) -> bool {
        self.token()
            .as_ref()
            .is_some_and(|c| !c.is_cancelled())
    }

    /// Wait for `start()`, then for both loops to finish. Any number of
    /// callers may wait; all of them see the same result.
    pub async fn join(&self) -> Result<(), ManagerError> {
        let mut finished = self.finished.subscribe();
        let result = match finished.wait_for(Option::is_some).await {
            Ok(result) => result.clone().unwrap_or(Ok(())),
            // The sender lives in `self`.
            Err(_) => Ok(()),
        };
        result
    }

    /// Drop a task that has not been launched yet.
    pub fn remove_pending(&self, id: TaskId) -> Option<Task> {
        self.shared.board().remove_pending(id)
    }

    /// Ask a running task's process to end. The poller reaps it on its next pass.
    pub fn terminate(&self, id: TaskId) -> bool {
        self.shared.board().terminate(id)
    }

    pub fn toggle_details(&self, id: TaskId) -> Option<bool> {
        self.shared.board().toggle_details(id)
    }

    /// Forget completed downloads and failed launches.
    pub fn clear_completed(&self) -> usize {
        self.shared.board().clear_completed()
    }

    /// Display rows for every queue and roster.
    pub fn snapshot(&self) -> TasksSnapshot {
        self.shared.board().snapshot()
    }

    fn token(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.cancel.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Await both loops and publish how they ended to every `join()` caller.
async fn supervise(
    worker: JoinHandle<()>,
    poller: JoinHandle<()>,
    finished: Arc<watch::Sender<Finished>>,
) {
    let mut result = Ok(());
    for (name, handle) in [("worker", worker), ("poller", poller)] {
        if let Err(source) = handle.await {
            error!(loop_name = name, error = %source, "task_manager loop failed");
            if result.is_ok() {
                result = Err(ManagerError::LoopFailed {
                    name,
                    source: Arc::new(source),
                });
            }
        }
    }
    debug!("task_manager joined");
    finished.send_replace(Some(result));
}

/// Sleep for `interval` unless cancelled first. Returns false on cancellation.
pub(crate) async fn suspend(cancel: &CancellationToken, interval: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(interval) => true,
    }
}
