//! Terminal and JSON rendering for cache commands.

use std::time::Duration;

use console::style;
use edge_cache::CacheStatus;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Renders command output as styled text, or as JSON documents with `--json`.
///
/// In JSON mode only [`Output::json`] and [`Output::error`] write anything.
#[derive(Clone)]
pub struct Output {
    verbose: bool,
    json: bool,
}

impl Output {
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    fn line(&self, stream: Stream, text: String) {
        if self.json {
            return;
        }
        match stream {
            Stream::Stdout => println!("{}", text),
            Stream::Stderr => eprintln!("{}", text),
        }
    }

    pub fn info(&self, msg: &str) {
        self.line(Stream::Stdout, format!("{} {}", style("ℹ").blue(), msg));
    }

    pub fn success(&self, msg: &str) {
        self.line(Stream::Stdout, format!("{} {}", style("✓").green(), msg));
    }

    pub fn warn(&self, msg: &str) {
        self.line(Stream::Stderr, format!("{} {}", style("⚠").yellow(), msg));
    }

    /// Errors are reported in both modes; JSON mode emits `{"error": ...}`.
    pub fn error(&self, msg: &str) {
        if self.json {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        } else {
            eprintln!("{} {}", style("✗").red(), style(msg).red());
        }
    }

    /// Only shown with `--verbose`.
    pub fn debug(&self, msg: &str) {
        if self.verbose {
            self.line(Stream::Stderr, format!("{} {}", style("→").dim(), style(msg).dim()));
        }
    }

    pub fn header(&self, msg: &str) {
        self.line(Stream::Stdout, format!("\n{}", style(msg).bold().underlined()));
    }

    /// Headline for a handled request: cache status, HTTP status, identity key.
    pub fn outcome(&self, key: &str, status: CacheStatus, http_status: u16, status_text: &str) {
        let http = format!("{} {}", http_status, status_text);
        self.line(
            Stream::Stdout,
            format!("\n{} {} {}", status_badge(status), style(http.trim_end()).bold(), key),
        );
    }

    pub fn json<T: Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string_pretty(value) {
            println!("{}", json);
        }
    }

    pub fn kv(&self, key: &str, value: &str) {
        self.line(Stream::Stdout, format!("  {}: {}", style(key).dim(), value));
    }

    pub fn list_item(&self, item: &str) {
        self.line(Stream::Stdout, format!("  {} {}", style("•").dim(), item));
    }

    /// Left-aligned columns padded to `widths`.
    pub fn table_row(&self, cols: &[&str], widths: &[usize]) {
        let cells: Vec<String> = cols
            .iter()
            .zip(widths)
            .map(|(col, width)| format!("{:width$}", col, width = *width))
            .collect();
        self.line(Stream::Stdout, format!("  {}", cells.join("  ")));
    }

    /// Hidden in JSON mode so stdout stays parseable.
    pub fn spinner(&self, msg: &str) -> ProgressBar {
        if self.json {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn is_json(&self) -> bool {
        self.json
    }
}

/// Colored cache status (`HIT`, `STALE`, ...).
pub fn status_badge(status: CacheStatus) -> String {
    let label = format!("{:<8}", status.to_string());
    match status {
        CacheStatus::Hit => style(label).green().bold().to_string(),
        CacheStatus::Miss => style(label).cyan().to_string(),
        CacheStatus::Stale | CacheStatus::Fallback => style(label).yellow().to_string(),
        CacheStatus::Offline => style(label).red().bold().to_string(),
        CacheStatus::Bypass => style(label).dim().to_string(),
    }
}

/// Whether a region belongs to the active build version.
pub fn region_badge(stale: bool) -> String {
    if stale {
        style("stale").yellow().to_string()
    } else {
        style("current").green().to_string()
    }
}

/// Entry body size, in binary units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

/// Entry age in its two largest units.
pub fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    match secs {
        0..=59 => format!("{}s", secs),
        60..=3599 => format!("{}m {}s", secs / 60, secs % 60),
        3600..=86_399 => format!("{}h {}m", secs / 3600, (secs % 3600) / 60),
        _ => format!("{}d {}h", secs / 86_400, (secs % 86_400) / 3600),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024 * 1024), "5120.00 GB");
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::from_millis(999)), "0s");
        assert_eq!(format_age(Duration::from_secs(301)), "5m 1s");
        assert_eq!(format_age(Duration::from_secs(7260)), "2h 1m");
        assert_eq!(format_age(Duration::from_secs(2 * 86_400 + 3 * 3600)), "2d 3h");
    }

    #[test]
    fn test_badges_carry_labels() {
        console::set_colors_enabled(false);
        assert_eq!(status_badge(CacheStatus::Stale).trim_end(), "STALE");
        assert_eq!(status_badge(CacheStatus::Offline).trim_end(), "OFFLINE");
        assert_eq!(region_badge(true), "stale");
        assert_eq!(region_badge(false), "current");
    }
}
