use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use streamglob_proto::protocol::{Progress, TaskId};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use super::command::CommandLine;
use super::progress::parse_progress_line;
use crate::error::LaunchError;
use crate::process::{ExitInfo, ProcessHandle, Progressable};

/// A spawned player or downloader.
///
/// Downloads carry a progress tracker fed from the child's output, which makes
/// them [`Progressable`]; plays don't.
pub struct ChildProcess {
    task: TaskId,
    pid: Option<u32>,
    child: Mutex<Child>,
    exit: Mutex<Option<ExitInfo>>,
    tracker: Option<Tracker>,
}

struct Tracker {
    output: PathBuf,
    latest: Arc<Mutex<Progress>>,
}

impl ChildProcess {
    /// Spawn `cmd`. With `output` set, progress is tracked from the child's
    /// output lines and the size of that file.
    pub fn spawn(
        task: TaskId,
        cmd: &CommandLine,
        output: Option<PathBuf>,
    ) -> Result<Self, LaunchError> {
        debug!(task = %task, "command: {} {:?}", cmd.program.display(), cmd.args);

        let mut child = Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: cmd.program.clone(),
                source,
            })?;
        let pid = child.id();

        let latest = Arc::new(Mutex::new(Progress::default()));
        let name = cmd
            .program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "child".to_string());

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(stdout, task, name.clone(), false, latest.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(stderr, task, name, true, latest.clone()));
        }

        Ok(Self {
            task,
            pid,
            child: Mutex::new(child),
            exit: Mutex::new(None),
            tracker: output.map(|output| Tracker { output, latest }),
        })
    }
}

impl ProcessHandle for ChildProcess {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn exit_status(&self) -> Option<ExitInfo> {
        let mut exit = self.exit.lock().unwrap_or_else(PoisonError::into_inner);
        if exit.is_none() {
            let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
            *exit = match child.try_wait() {
                Ok(status) => status.map(ExitInfo::from),
                Err(e) => {
                    warn!(task = %self.task, error = %e, "failed to poll child, treating as exited");
                    Some(ExitInfo::failure(None))
                }
            };
        }
        *exit
    }

    fn terminate(&self) {
        let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        match child.start_kill() {
            Ok(()) => debug!(task = %self.task, pid = ?self.pid, "kill sent"),
            // Already exited and reaped.
            Err(e) => debug!(task = %self.task, error = %e, "kill skipped"),
        }
    }

    fn as_progressable(&self) -> Option<&dyn Progressable> {
        self.tracker.as_ref().map(|_| self as &dyn Progressable)
    }
}

#[async_trait]
impl Progressable for ChildProcess {
    async fn update_progress(&self) -> anyhow::Result<Progress> {
        let Some(tracker) = self.tracker.as_ref() else {
            anyhow::bail!("task {} does not report progress", self.task);
        };
        let mut progress = tracker
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        // The file may not exist until the first bytes arrive.
        if let Ok(meta) = tokio::fs::metadata(&tracker.output).await {
            progress.bytes = Some(meta.len());
        }
        Ok(progress)
    }
}

/// Log every output line and keep the latest progress reading.
async fn forward_output<R>(
    stream: R,
    task: TaskId,
    name: String,
    is_stderr: bool,
    latest: Arc<Mutex<Progress>>,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(progress) = parse_progress_line(&line) {
            *latest.lock().unwrap_or_else(PoisonError::into_inner) = progress;
            continue;
        }
        if is_stderr {
            warn!(task = %task, "{} stderr: {}", name, line);
        } else {
            debug!(task = %task, "{}: {}", name, line);
        }
    }
}
