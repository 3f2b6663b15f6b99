//! Task scheduling and process supervision.
//!
//! [`TaskManager`] accepts play and download requests, queues them, keeps the
//! number of running downloads under a cap, launches external processes
//! through a [`Launcher`] and supervises them until they exit.
//!
//! ```text
//!   play()/download() ──► to_play / to_download
//!                              │
//!                   worker ────┘  (plays first, downloads while active < max)
//!                      │
//!                      ├──► playing ──┐
//!                      └──► active  ──┤
//!                                     │
//!                   poller ◄──────────┘  reap exited, elapsed, progress
//!                      │
//!                      └──► done (downloads)  + RefreshSink::refresh()
//! ```

pub mod board;
pub mod error;
pub mod launcher;
pub mod manager;
pub mod process;
pub mod queue;
pub mod refresh;
pub mod task;

mod poller;
mod worker;

pub use board::TaskBoard;
pub use error::{LaunchError, ManagerError};
pub use launcher::{Launcher, ProgramLauncher};
pub use manager::TaskManager;
pub use process::{ExitInfo, ProcessHandle, Progressable};
pub use queue::TaskList;
pub use refresh::{NoRefresh, RefreshFn, RefreshSink};
pub use task::{DownloadPayload, PlayPayload, Task, TaskPayload};

pub use streamglob_proto::protocol::{
    MediaItem, ProgramSpec, Progress, TaskAction, TaskId, TaskOptions, TaskOutcome, TaskState,
    TaskView, TasksSnapshot,
};
