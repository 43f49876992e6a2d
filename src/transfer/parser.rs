//! Parser for yt-dlp `--newline` progress output

use super::handle::TransferProgress;
use regex::Regex;
use std::sync::OnceLock;

fn progress_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // [download]  42.3% of ~ 120.50MiB at  2.31MiB/s ETA 00:41 (frag 3/20)
        #[allow(clippy::expect_used)]
        Regex::new(
            r"^\[download\]\s+(?P<percent>\d+(?:\.\d+)?)%(?:\s+of\s+~?\s*(?P<total>\d+(?:\.\d+)?[KMGT]?i?B))?(?:\s+in\s+\S+)?(?:\s+at\s+(?P<speed>\S+))?(?:\s+ETA\s+(?P<eta>\S+))?",
        )
        .expect("progress regex is valid")
    })
}

/// Parse one line of yt-dlp output into a progress notification
///
/// Returns `None` for lines that are not download progress lines.
pub fn parse_progress_line(line: &str) -> Option<TransferProgress> {
    let caps = progress_regex().captures(line.trim())?;
    let percent: f64 = caps.name("percent")?.as_str().parse().ok()?;
    let total_bytes = caps.name("total").and_then(|m| parse_size(m.as_str()));
    let transferred_bytes = total_bytes
        .map(|total| (total as f64 * percent / 100.0) as u64)
        .unwrap_or(0);
    let known = |name: &str| {
        caps.name(name)
            .map(|m| m.as_str().to_string())
            .filter(|v| v != "Unknown" && v != "N/A")
    };

    Some(TransferProgress {
        percent,
        transferred_bytes,
        total_bytes,
        speed: known("speed"),
        eta: known("eta"),
    })
}

/// Convert a yt-dlp size such as `120.50MiB` or `3GB` into bytes
pub fn parse_size(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(raw.len());
    let (number, unit) = raw.split_at(split);
    let value: f64 = number.parse().ok()?;
    let multiplier: f64 = match unit {
        "B" | "" => 1.0,
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
    Some((value * multiplier) as u64)
}
