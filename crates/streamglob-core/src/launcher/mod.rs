//! Launching external players and downloaders.
//!
//! The worker only sees the [`Launcher`] trait. [`ProgramLauncher`] is the
//! real implementation, spawning child processes with `tokio::process`.

mod child;
mod command;
mod progress;

pub use child::ChildProcess;
pub use command::{download_command, output_path, play_command, CommandLine};
pub use progress::parse_progress_line;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use streamglob_proto::config::DownloaderConfig;
use streamglob_proto::protocol::ProgramSpec;
use tracing::info;

use crate::error::LaunchError;
use crate::process::ProcessHandle;
use crate::task::{DownloadPayload, PlayPayload, Task};

/// Starts the process behind a task.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn play(
        &self,
        task: &Task,
        payload: &PlayPayload,
    ) -> Result<Arc<dyn ProcessHandle>, LaunchError>;

    async fn download(
        &self,
        task: &Task,
        payload: &DownloadPayload,
    ) -> Result<Arc<dyn ProcessHandle>, LaunchError>;
}

/// Spawns players and downloaders as child processes.
pub struct ProgramLauncher {
    downloader: ProgramSpec,
    output_dir: PathBuf,
}

impl ProgramLauncher {
    pub fn new(downloader: ProgramSpec, output_dir: PathBuf) -> Self {
        Self {
            downloader,
            output_dir,
        }
    }

    pub fn from_config(config: &DownloaderConfig) -> Self {
        Self::new(config.spec(), config.output_dir.clone())
    }
}

#[async_trait]
impl Launcher for ProgramLauncher {
    async fn play(
        &self,
        task: &Task,
        payload: &PlayPayload,
    ) -> Result<Arc<dyn ProcessHandle>, LaunchError> {
        if task.media().sources.is_empty() {
            return Err(LaunchError::NoSources(task.id()));
        }
        let cmd = play_command(payload, &task.media().sources);
        info!(task = %task.id(), program = %cmd.program.display(), "starting player");
        let child = ChildProcess::spawn(task.id(), &cmd, None)?;
        Ok(Arc::new(child))
    }

    async fn download(
        &self,
        task: &Task,
        payload: &DownloadPayload,
    ) -> Result<Arc<dyn ProcessHandle>, LaunchError> {
        if task.media().sources.is_empty() {
            return Err(LaunchError::NoSources(task.id()));
        }
        let path = output_path(&self.output_dir, &payload.filename);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| LaunchError::OutputDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let cmd = download_command(&self.downloader, payload, &path, &task.media().sources);
        info!(
            task = %task.id(),
            program = %cmd.program.display(),
            output = %path.display(),
            "starting download"
        );
        let child = ChildProcess::spawn(task.id(), &cmd, Some(path))?;
        Ok(Arc::new(child))
    }
}
