use std::sync::OnceLock;

use regex::Regex;
use streamglob_proto::protocol::Progress;

/// yt-dlp: `[download]  45.3% of ~50.12MiB at  2.56MiB/s ETA 00:12`
fn percent_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\[download\]\s+(?P<pct>\d+(?:\.\d+)?)%(?:.*?\bat\s+(?P<rate>\S+))?(?:.*?\bETA\s+(?P<eta>\S+))?",
        )
        .expect("percent pattern is valid")
    })
}

/// streamlink: `[download][game.ts] Written 12.3 MiB to game.ts (5s @ 2.4 MiB/s)`
fn written_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\[download\].*?\bWritten\s+(?P<size>\d+(?:\.\d+)?)\s*(?P<unit>[KMGT]?i?B|bytes)\b(?:.*@\s*(?P<rate>[^)]*?)\s*\))?",
        )
        .expect("written pattern is valid")
    })
}

/// Parse one line of downloader output.
pub fn parse_progress_line(line: &str) -> Option<Progress> {
    if let Some(caps) = percent_line().captures(line) {
        let percent: f32 = caps.name("pct")?.as_str().parse().ok()?;
        return Some(Progress {
            fraction: Some((percent / 100.0).clamp(0.0, 1.0)),
            bytes: None,
            rate: caps.name("rate").map(|m| m.as_str().to_string()),
            eta: caps.name("eta").map(|m| m.as_str().to_string()),
        });
    }

    let caps = written_line().captures(line)?;
    let bytes = parse_size(caps.name("size")?.as_str(), caps.name("unit")?.as_str())?;
    Some(Progress {
        fraction: None,
        bytes: Some(bytes),
        rate: caps
            .name("rate")
            .map(|m| m.as_str().to_string())
            .filter(|r| !r.is_empty()),
        eta: None,
    })
}

fn parse_size(value: &str, unit: &str) -> Option<u64> {
    let value: f64 = value.parse().ok()?;
    let scale = match unit {
        "B" | "bytes" => 1.0,
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => 1024.0 * 1024.0 * 1024.0,
        "TiB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "KB" => 1e3,
        "MB" => 1e6,
        "GB" => 1e9,
        "TB" => 1e12,
        _ => return None,
    };
    Some((value * scale) as u64)
}
