use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use streamglob_proto::protocol::{MediaItem, ProgramSpec, TaskOptions};

/// Play or record streams through an external player and downloader.
#[derive(Debug, Parser)]
#[command(name = "streamglob", version, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default location.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Maximum number of concurrent downloads.
    #[arg(long, global = true, value_name = "N")]
    pub max: Option<usize>,

    /// Mirror the log to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open one or more sources in the player.
    Play {
        #[arg(required = true, value_name = "SOURCE")]
        sources: Vec<String>,

        #[command(flatten)]
        task: TaskArgs,
    },

    /// Record one or more sources to a file.
    Download {
        #[arg(required = true, value_name = "SOURCE")]
        sources: Vec<String>,

        /// Output file, relative to the configured output directory unless absolute.
        #[arg(short, long, value_name = "FILE")]
        output: String,

        #[command(flatten)]
        task: TaskArgs,
    },

    /// Print the effective configuration.
    Config,
}

#[derive(Debug, Args)]
pub struct TaskArgs {
    /// Title shown in the task list; defaults to the first source.
    #[arg(long)]
    pub title: Option<String>,

    /// Program that resolves the stream (e.g. streamlink).
    #[arg(long, value_name = "PROG")]
    pub helper: Option<PathBuf>,

    /// Extra option passed on as `--key=value` (or `--key` with no value).
    #[arg(short = 'O', long = "option", value_name = "KEY[=VALUE]", value_parser = parse_option)]
    pub options: Vec<(String, String)>,
}

impl TaskArgs {
    pub fn media(&self, sources: Vec<String>) -> MediaItem {
        let title = self
            .title
            .clone()
            .or_else(|| sources.first().cloned())
            .unwrap_or_default();
        MediaItem::new(title, sources)
    }

    pub fn helper(&self) -> Option<ProgramSpec> {
        self.helper.clone().map(ProgramSpec::new)
    }

    pub fn options(&self) -> TaskOptions {
        self.options.iter().cloned().collect()
    }
}

fn parse_option(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw.split_once('=').unwrap_or((raw, ""));
    let key = key.trim().trim_start_matches('-');
    if key.is_empty() {
        return Err(format!("missing option name in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}
