//! Poller loop: reaps exited processes and refreshes running downloads.

use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::manager::{suspend, Shared};

pub(crate) async fn run(shared: Arc<Shared>, cancel: CancellationToken) {
    info!("poller: starting");
    'poll: loop {
        let (reaped, progressable) = {
            let mut board = shared.board();
            let reaped = board.reap();
            let progressable = board.tick_active(Instant::now());
            (reaped, progressable)
        };
        if !reaped.downloads.is_empty() {
            // A download slot may have opened up.
            shared.wake.notify_one();
        }

        for (id, process) in progressable {
            let Some(progressable) = process.as_progressable() else {
                continue;
            };
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break 'poll,
                result = progressable.update_progress() => result,
            };
            match result {
                Ok(progress) => shared.board().set_progress(id, progress),
                Err(e) => debug!(task = %id, error = %e, "progress update failed"),
            }
        }

        shared.sink.refresh();

        if !suspend(&cancel, shared.interval).await {
            break;
        }
    }
    info!("poller: stopped");
}
