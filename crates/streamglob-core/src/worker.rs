//! Worker loop: takes the next task off the queues and launches it.

use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::manager::{suspend, Shared};
use crate::task::{Task, TaskPayload};

pub(crate) async fn run(shared: Arc<Shared>, cancel: CancellationToken) {
    info!("worker: starting");
    loop {
        let Some(task) = wait_for_item(&shared, &cancel).await else {
            break;
        };
        dispatch(&shared, task).await;

        // One launch per interval.
        if !suspend(&cancel, shared.interval).await {
            break;
        }
    }
    info!("worker: stopped");
}

/// Next launchable task, or `None` once cancelled.
async fn wait_for_item(shared: &Shared, cancel: &CancellationToken) -> Option<Task> {
    loop {
        if cancel.is_cancelled() {
            return None;
        }
        let next = shared.board().take_next(shared.max_concurrent);
        if next.is_some() {
            return next;
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            _ = shared.wake.notified() => {}
            _ = tokio::time::sleep(shared.interval) => {}
        }
    }
}

/// Launch one task. A failed launch completes that task and nothing else.
async fn dispatch(shared: &Shared, task: Task) {
    let id = task.id();
    info!(
        task = %id,
        title = %task.media().title,
        "{} task",
        match task.payload() {
            TaskPayload::Play(_) => "playing",
            TaskPayload::Download(_) => "downloading",
        }
    );

    let launched = match task.payload() {
        TaskPayload::Play(payload) => shared.launcher.play(&task, payload).await,
        TaskPayload::Download(payload) => shared.launcher.download(&task, payload).await,
    };
    let now = Instant::now();

    // The stop check happens inside `promote`, under the same lock as
    // `terminate_all`.
    match launched {
        Ok(process) => {
            shared.board().promote(task, process, now);
        }
        Err(e) => {
            error!(task = %id, error = %e, "launch failed");
            shared.board().fail_launch(task, e.to_string());
        }
    }
    shared.sink.refresh();
}
