use std::path::PathBuf;
use std::sync::Arc;

use streamglob_proto::protocol::TaskId;
use thiserror::Error;

/// A launcher could not produce a process for a task. Contained per task:
/// the task is completed as failed and scheduling continues.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("task {0} has no media sources")]
    NoSources(TaskId),

    #[error("failed to spawn {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot prepare output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

/// Failures of the task manager itself, surfaced from `join()`. Cloned to
/// every caller.
#[derive(Debug, Clone, Error)]
pub enum ManagerError {
    #[error("{name} loop failed: {source}")]
    LoopFailed {
        name: &'static str,
        #[source]
        source: Arc<tokio::task::JoinError>,
    },
}
