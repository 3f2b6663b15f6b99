//! Argument lists for player, helper and downloader processes.

use std::path::{Path, PathBuf};

use streamglob_proto::protocol::{ProgramSpec, TaskOptions};

use crate::task::{DownloadPayload, PlayPayload};

/// Option key consumed as the stream-quality positional instead of a flag.
const QUALITY_KEY: &str = "quality";
const DEFAULT_QUALITY: &str = "best";

#[derive(Debug, Clone, PartialEq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// `player args… opts… sources…`, or when a helper resolves the stream:
/// `helper args… --player "<player>" opts… sources… [quality]`.
pub fn play_command(payload: &PlayPayload, sources: &[String]) -> CommandLine {
    match &payload.helper {
        None => {
            let mut args = payload.player.args.clone();
            args.extend(option_flags(&payload.options));
            args.extend(sources.iter().cloned());
            CommandLine {
                program: payload.player.program.clone(),
                args,
            }
        }
        Some(helper) => {
            let mut args = helper.args.clone();
            args.push("--player".to_string());
            args.push(payload.player.command_line());
            args.extend(option_flags(&payload.options));
            args.extend(sources.iter().cloned());
            args.extend(quality_arg(&helper.program, &payload.options));
            CommandLine {
                program: helper.program.clone(),
                args,
            }
        }
    }
}

/// `downloader args… opts… -o <path> sources… [quality]`. A helper replaces
/// the configured downloader.
pub fn download_command(
    downloader: &ProgramSpec,
    payload: &DownloadPayload,
    path: &Path,
    sources: &[String],
) -> CommandLine {
    let spec = payload.helper.as_ref().unwrap_or(downloader);
    let mut args = spec.args.clone();
    args.extend(option_flags(&payload.options));
    args.push("-o".to_string());
    args.push(path.display().to_string());
    args.extend(sources.iter().cloned());
    args.extend(quality_arg(&spec.program, &payload.options));
    CommandLine {
        program: spec.program.clone(),
        args,
    }
}

/// Absolute filenames are kept, relative ones land in `output_dir`.
pub fn output_path(output_dir: &Path, filename: &str) -> PathBuf {
    let path = Path::new(filename);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        output_dir.join(path)
    }
}

/// `--key=value`, or `--key` for an empty value.
fn option_flags(options: &TaskOptions) -> impl Iterator<Item = String> + '_ {
    options
        .iter()
        .filter(|(k, _)| k.as_str() != QUALITY_KEY)
        .map(|(k, v)| {
            if v.is_empty() {
                format!("--{}", k)
            } else {
                format!("--{}={}", k, v)
            }
        })
}

/// streamlink wants the stream quality as a trailing positional; other tools
/// only get one when asked for explicitly.
fn quality_arg(program: &Path, options: &TaskOptions) -> Option<String> {
    let is_streamlink = program
        .file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.starts_with("streamlink"));
    match options.get(QUALITY_KEY) {
        Some(q) => Some(q.clone()),
        None if is_streamlink => Some(DEFAULT_QUALITY.to_string()),
        None => None,
    }
}
