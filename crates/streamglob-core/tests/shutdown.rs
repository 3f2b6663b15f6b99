//! `stop()` and `join()` on the multi-thread runtime, on a wall clock with a
//! short interval.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common::{media, FakeLauncher, FakeProcess};
use streamglob_core::{
    DownloadPayload, ExitInfo, LaunchError, Launcher, NoRefresh, PlayPayload, ProcessHandle,
    ProgramSpec, Task, TaskManager, TaskOptions, TaskOutcome,
};
use streamglob_proto::config::TasksConfig;
use tokio::sync::Notify;
use tokio::time::{sleep, timeout};

const WAIT: Duration = Duration::from_secs(10);

fn new_manager(launcher: Arc<dyn Launcher>) -> TaskManager {
    let config = TasksConfig {
        max: 20,
        poll_interval_ms: 20,
    };
    TaskManager::new(&config, launcher, Arc::new(NoRefresh))
}

async fn wait_until(mut ready: impl FnMut() -> bool) {
    timeout(WAIT, async {
        while !ready() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never held");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scenario_d_on_multi_thread_runtime() {
    let launcher = FakeLauncher::new();
    let manager = new_manager(launcher.clone());
    let d1 = manager.download(media("d1"), "d1.ts", None, TaskOptions::new());
    let d2 = manager.download(media("d2"), "d2.ts", None, TaskOptions::new());
    let p1 = manager.play(media("p1"), ProgramSpec::new("mpv"), None, TaskOptions::new());
    manager.start();
    wait_until(|| manager.snapshot().running_len() == 3).await;

    manager.stop();
    timeout(WAIT, manager.join())
        .await
        .expect("join timed out")
        .unwrap();

    let snap = manager.snapshot();
    assert!(snap.active.is_empty());
    assert!(snap.playing.is_empty());
    for id in [d1, d2, p1] {
        assert!(launcher.process(id).was_terminated(), "{} not terminated", id);
    }
}

/// A player whose termination releases the pending download launch and then
/// stalls, so the launch lands while `stop()` is still emptying the rosters.
struct StallingPlayer {
    release: Arc<Notify>,
    terminated: AtomicBool,
}

impl ProcessHandle for StallingPlayer {
    fn pid(&self) -> Option<u32> {
        Some(7)
    }

    fn exit_status(&self) -> Option<ExitInfo> {
        None
    }

    fn terminate(&self) {
        self.terminated.store(true, Ordering::SeqCst);
        self.release.notify_one();
        std::thread::sleep(Duration::from_millis(300));
    }
}

#[derive(Default)]
struct GatedLauncher {
    release: Arc<Notify>,
    download_in_flight: AtomicBool,
    download: Mutex<Option<Arc<FakeProcess>>>,
}

#[async_trait]
impl Launcher for GatedLauncher {
    async fn play(
        &self,
        _task: &Task,
        _payload: &PlayPayload,
    ) -> Result<Arc<dyn ProcessHandle>, LaunchError> {
        Ok(Arc::new(StallingPlayer {
            release: Arc::clone(&self.release),
            terminated: AtomicBool::new(false),
        }))
    }

    async fn download(
        &self,
        _task: &Task,
        _payload: &DownloadPayload,
    ) -> Result<Arc<dyn ProcessHandle>, LaunchError> {
        self.download_in_flight.store(true, Ordering::SeqCst);
        self.release.notified().await;
        let process = Arc::new(FakeProcess::new(8, false));
        *self.download.lock().unwrap() = Some(Arc::clone(&process));
        Ok(process)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn launch_finishing_during_stop_is_terminated() {
    let launcher = Arc::new(GatedLauncher::default());
    let manager = new_manager(launcher.clone());
    manager.play(media("p1"), ProgramSpec::new("mpv"), None, TaskOptions::new());
    let d1 = manager.download(media("d1"), "d1.ts", None, TaskOptions::new());
    manager.start();

    wait_until(|| {
        manager.snapshot().playing.len() == 1
            && launcher.download_in_flight.load(Ordering::SeqCst)
    })
    .await;

    manager.stop();
    timeout(WAIT, manager.join())
        .await
        .expect("join timed out")
        .unwrap();

    let snap = manager.snapshot();
    assert!(snap.active.is_empty(), "active after stop: {:?}", snap.active);
    let download = launcher.download.lock().unwrap().clone().unwrap();
    assert!(download.was_terminated());
    assert_eq!(
        snap.find(d1).and_then(|t| t.outcome.clone()),
        Some(TaskOutcome::Cancelled)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_join_caller_waits_for_the_loops() {
    let manager = Arc::new(new_manager(FakeLauncher::new()));
    manager.start();

    let joiners: Vec<_> = (0..3)
        .map(|_| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.join().await })
        })
        .collect();

    sleep(Duration::from_millis(200)).await;
    assert!(manager.is_running());
    assert!(joiners.iter().all(|j| !j.is_finished()));
    assert!(timeout(Duration::from_millis(100), manager.join())
        .await
        .is_err());

    manager.stop();
    for joiner in joiners {
        timeout(WAIT, joiner)
            .await
            .expect("join timed out")
            .unwrap()
            .unwrap();
    }

    // Already finished: returns at once.
    timeout(Duration::from_millis(100), manager.join())
        .await
        .expect("join after finish timed out")
        .unwrap();
}
