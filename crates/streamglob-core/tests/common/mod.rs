//! Fake launcher and process handles for driving the task manager in tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use streamglob_core::{
    DownloadPayload, ExitInfo, LaunchError, Launcher, MediaItem, PlayPayload, ProcessHandle,
    Progress, Progressable, Task, TaskId,
};

pub struct FakeProcess {
    pid: u32,
    exit: Mutex<Option<ExitInfo>>,
    terminated: AtomicBool,
    progressable: bool,
    progress_calls: AtomicUsize,
}

impl FakeProcess {
    pub fn new(pid: u32, progressable: bool) -> Self {
        Self {
            pid,
            exit: Mutex::new(None),
            terminated: AtomicBool::new(false),
            progressable,
            progress_calls: AtomicUsize::new(0),
        }
    }

    pub fn exit_with(&self, exit: ExitInfo) {
        *self.exit.lock().unwrap() = Some(exit);
    }

    pub fn was_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    pub fn progress_calls(&self) -> usize {
        self.progress_calls.load(Ordering::SeqCst)
    }
}

impl ProcessHandle for FakeProcess {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn exit_status(&self) -> Option<ExitInfo> {
        *self.exit.lock().unwrap()
    }

    fn terminate(&self) {
        self.terminated.store(true, Ordering::SeqCst);
        self.exit_with(ExitInfo::failure(None));
    }

    fn as_progressable(&self) -> Option<&dyn Progressable> {
        if self.progressable {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl Progressable for FakeProcess {
    async fn update_progress(&self) -> anyhow::Result<Progress> {
        let calls = self.progress_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Progress {
            fraction: Some((calls as f32 / 10.0).min(1.0)),
            ..Progress::default()
        })
    }
}

/// Records launch order and hands out [`FakeProcess`]es. Tasks whose title is
/// in `failing` fail to launch.
#[derive(Default)]
pub struct FakeLauncher {
    launched: Mutex<Vec<TaskId>>,
    processes: Mutex<HashMap<TaskId, Arc<FakeProcess>>>,
    failing: Mutex<HashSet<String>>,
    progressable: bool,
}

impl FakeLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_progress() -> Arc<Self> {
        Arc::new(Self {
            progressable: true,
            ..Self::default()
        })
    }

    pub fn fail_title(&self, title: &str) {
        self.failing.lock().unwrap().insert(title.to_string());
    }

    pub fn launched(&self) -> Vec<TaskId> {
        self.launched.lock().unwrap().clone()
    }

    pub fn process(&self, id: TaskId) -> Arc<FakeProcess> {
        self.processes
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_else(|| panic!("task {} was never launched", id))
    }

    fn launch(&self, task: &Task, progressable: bool) -> Result<Arc<dyn ProcessHandle>, LaunchError> {
        if self.failing.lock().unwrap().contains(&task.media().title) {
            return Err(LaunchError::Other(format!("cannot start {}", task.media().title)));
        }
        let process = Arc::new(FakeProcess::new(1000 + task.id().0 as u32, progressable));
        self.launched.lock().unwrap().push(task.id());
        self.processes
            .lock()
            .unwrap()
            .insert(task.id(), Arc::clone(&process));
        Ok(process)
    }
}

#[async_trait]
impl Launcher for FakeLauncher {
    async fn play(
        &self,
        task: &Task,
        _payload: &PlayPayload,
    ) -> Result<Arc<dyn ProcessHandle>, LaunchError> {
        self.launch(task, false)
    }

    async fn download(
        &self,
        task: &Task,
        _payload: &DownloadPayload,
    ) -> Result<Arc<dyn ProcessHandle>, LaunchError> {
        self.launch(task, self.progressable)
    }
}

pub fn media(title: &str) -> MediaItem {
    MediaItem::new(title, vec![format!("https://example.invalid/{}.m3u8", title)])
}
