mod cli;
mod logging;

use std::sync::Arc;

use anyhow::bail;
use clap::Parser;
use streamglob_core::{ProgramLauncher, TaskId, TaskManager, TaskState, TaskView};
use streamglob_proto::config::Config;
use streamglob_proto::protocol::BroadcastMessage;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info};

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (broadcast_tx, _) = broadcast::channel::<BroadcastMessage>(100);
    let log_path = logging::init(cli.verbose, broadcast_tx.clone())?;
    eprintln!("log: {}", log_path.display());

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(max) = cli.max {
        config.tasks.max = max;
    }
    info!(
        "config loaded from {:?}",
        cli.config.clone().unwrap_or_else(Config::config_path)
    );

    let launcher = Arc::new(ProgramLauncher::from_config(&config.downloader));
    let manager = TaskManager::new(&config.tasks, launcher, Arc::new(broadcast_tx.clone()));

    let id = match cli.command {
        Command::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            return Ok(());
        }
        Command::Play { sources, task } => manager.play(
            task.media(sources),
            config.player.spec(),
            task.helper(),
            task.options(),
        ),
        Command::Download {
            sources,
            output,
            task,
        } => manager.download(task.media(sources), output, task.helper(), task.options()),
    };

    let rx = broadcast_tx.subscribe();
    manager.start();
    let result = watch_task(&manager, id, rx, cli.verbose).await;

    manager.stop();
    manager.join().await?;
    result?;

    match manager.snapshot().find(id) {
        Some(row) => {
            println!("{}", describe(row));
            if let Some(outcome) = row.outcome.as_ref().filter(|o| o.is_failure()) {
                bail!("task {} {}", id, outcome);
            }
        }
        None => println!("{} finished", id),
    }
    Ok(())
}

/// Print status changes for `id` until it finishes or Ctrl-C.
async fn watch_task(
    manager: &TaskManager,
    id: TaskId,
    mut rx: broadcast::Receiver<BroadcastMessage>,
    verbose: bool,
) -> anyhow::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut last = String::new();

    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                res?;
                info!("interrupted");
                eprintln!("interrupted, stopping");
                return Ok(());
            }
            msg = rx.recv() => match msg {
                Ok(BroadcastMessage::TasksUpdated) => {}
                // Already on stderr when verbose.
                Ok(BroadcastMessage::Log(line)) => {
                    if !verbose {
                        eprintln!("{}", line);
                    }
                    continue;
                }
                Err(RecvError::Lagged(n)) => debug!("missed {} updates", n),
                Err(RecvError::Closed) => return Ok(()),
            },
        }

        let snapshot = manager.snapshot();
        let Some(row) = snapshot.find(id) else {
            // Plays leave the rosters as soon as the player exits.
            return Ok(());
        };
        let line = describe(row);
        if line != last {
            println!("{}", line);
            last = line;
        }
        if row.state == TaskState::Completed {
            return Ok(());
        }
    }
}

fn describe(row: &TaskView) -> String {
    let mut line = format!("{} {} {}", row.id, row.action, row.title);
    if let Some(filename) = &row.filename {
        line.push_str(&format!(" -> {}", filename));
    }
    match row.state {
        TaskState::Queued => line.push_str(" [queued]"),
        TaskState::Running => {
            line.push_str(&format!(" [running {}s", row.elapsed_ms / 1000));
            if let Some(pid) = row.pid {
                line.push_str(&format!(" pid {}", pid));
            }
            line.push(']');
            if let Some(progress) = &row.progress {
                if let Some(fraction) = progress.fraction {
                    line.push_str(&format!(" {:.1}%", fraction * 100.0));
                }
                if let Some(bytes) = progress.bytes {
                    line.push_str(&format!(" {:.1} MiB", bytes as f64 / (1024.0 * 1024.0)));
                }
                if let Some(rate) = &progress.rate {
                    line.push_str(&format!(" @ {}", rate));
                }
                if let Some(eta) = &progress.eta {
                    line.push_str(&format!(" ETA {}", eta));
                }
            }
        }
        TaskState::Completed => {
            let outcome = row
                .outcome
                .as_ref()
                .map(|o| o.to_string())
                .unwrap_or_else(|| "done".to_string());
            line.push_str(&format!(" [{}]", outcome));
        }
    }
    line
}
