use std::path::PathBuf;

pub fn data_dir() -> PathBuf {
    // On macOS and Linux, use ~/.local/share/streamglob/ (XDG standard)
    // instead of macOS Application Support for consistency
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join("streamglob")
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("streamglob")
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("streamglob")
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("streamglob")
    }
}

pub fn downloads_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("streamglob-downloads")
}

#[cfg(unix)]
fn player_binary_names() -> &'static [&'static str] {
    &["mpv"]
}

#[cfg(windows)]
fn player_binary_names() -> &'static [&'static str] {
    &["mpv.exe", "mpv"]
}

#[cfg(unix)]
fn downloader_binary_names() -> &'static [&'static str] {
    &["streamlink", "yt-dlp"]
}

#[cfg(windows)]
fn downloader_binary_names() -> &'static [&'static str] {
    &["streamlink.exe", "yt-dlp.exe", "streamlink", "yt-dlp"]
}

fn find_beside_exe(names: &[&str]) -> Option<PathBuf> {
    let current_exe = std::env::current_exe().ok()?;
    let dir = current_exe.parent()?;
    for name in names {
        let p = dir.join(name);
        if p.exists() {
            return Some(p);
        }
        let p = dir.join("external").join(name);
        if p.exists() {
            return Some(p);
        }
    }
    None
}

fn find_on_path(names: &[&str]) -> Option<PathBuf> {
    let path = std::env::var("PATH").ok()?;
    #[cfg(unix)]
    let sep = ":";
    #[cfg(windows)]
    let sep = ";";
    // Name order wins over PATH order so preferred tools are picked first.
    for name in names {
        for dir in path.split(sep) {
            let p = PathBuf::from(dir).join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }
    None
}

fn find_from_env(var: &str) -> Option<PathBuf> {
    let path = PathBuf::from(std::env::var(var).ok()?);
    path.exists().then_some(path)
}

/// Find the media player binary.
///
/// Searches in order:
/// 1. STREAMGLOB_PLAYER environment variable
/// 2. Beside current executable
/// 3. PATH
pub fn find_player_binary() -> Option<PathBuf> {
    find_from_env("STREAMGLOB_PLAYER")
        .or_else(|| find_beside_exe(player_binary_names()))
        .or_else(|| find_on_path(player_binary_names()))
}

/// Find the stream downloader binary, preferring streamlink over yt-dlp.
///
/// Same search order as [`find_player_binary`], keyed on
/// STREAMGLOB_DOWNLOADER.
pub fn find_downloader_binary() -> Option<PathBuf> {
    find_from_env("STREAMGLOB_DOWNLOADER")
        .or_else(|| find_beside_exe(downloader_binary_names()))
        .or_else(|| find_on_path(downloader_binary_names()))
}
