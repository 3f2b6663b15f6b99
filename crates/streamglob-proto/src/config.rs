use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform;
use super::protocol::ProgramSpec;

pub const DEFAULT_MAX_CONCURRENT_TASKS: usize = 20;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub downloader: DownloaderConfig,
}

/// Scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Maximum number of downloads running at once. Plays are not capped.
    #[serde(default = "default_max_tasks")]
    pub max: usize,
    /// Period of both the scheduler and the monitor loop.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_player_program")]
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloaderConfig {
    #[serde(default = "default_downloader_program")]
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    /// Directory relative download filenames are resolved against.
    #[serde(default = "platform::downloads_dir")]
    pub output_dir: PathBuf,
}

impl TasksConfig {
    /// The configured cap, never below one.
    pub fn max_concurrent_tasks(&self) -> usize {
        self.max.max(1)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl PlayerConfig {
    pub fn spec(&self) -> ProgramSpec {
        ProgramSpec::new(self.program.clone()).with_args(self.args.clone())
    }
}

impl DownloaderConfig {
    pub fn spec(&self) -> ProgramSpec {
        ProgramSpec::new(self.program.clone()).with_args(self.args.clone())
    }
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            max: default_max_tasks(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            program: default_player_program(),
            args: Vec::new(),
        }
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            program: default_downloader_program(),
            args: Vec::new(),
            output_dir: platform::downloads_dir(),
        }
    }
}

fn default_max_tasks() -> usize {
    DEFAULT_MAX_CONCURRENT_TASKS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_player_program() -> PathBuf {
    platform::find_player_binary().unwrap_or_else(|| PathBuf::from("mpv"))
}

fn default_downloader_program() -> PathBuf {
    platform::find_downloader_binary().unwrap_or_else(|| PathBuf::from("streamlink"))
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path`, writing the defaults there first if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("wrote default config to {:?}", path);
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `STREAMGLOB_CONFIG` if set, else `config.toml` in the config dir.
    pub fn config_path() -> PathBuf {
        std::env::var_os("STREAMGLOB_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| platform::config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tasks.max, 20);
        assert_eq!(config.tasks.poll_interval(), Duration::from_secs(1));
        assert!(config.player.args.is_empty());
        assert!(config
            .downloader
            .output_dir
            .ends_with("streamglob-downloads"));
    }

    #[test]
    fn test_cap_never_below_one() {
        let tasks = TasksConfig {
            max: 0,
            poll_interval_ms: 0,
        };
        assert_eq!(tasks.max_concurrent_tasks(), 1);
        assert_eq!(tasks.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str("[tasks]\nmax = 3\n").unwrap();
        assert_eq!(config.tasks.max, 3);
        assert_eq!(config.tasks.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    }

    #[test]
    fn test_load_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.tasks.max, DEFAULT_MAX_CONCURRENT_TASKS);

        let mut changed = config.clone();
        changed.tasks.max = 4;
        changed.player.args = vec!["--fs".to_string()];
        changed.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.tasks.max, 4);
        assert_eq!(reloaded.player.args, vec!["--fs".to_string()]);
    }
}
