//! Console presentation of warming events.

use std::time::Duration;

use console::style;
use tilewarm::warmer::{ProgressReport, WarmEvent, WarmObserver};
use tracing::{debug, info, warn};

/// Logs run events to stderr and prints listed URLs to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }
}

impl WarmObserver for ConsoleReporter {
    fn on_event(&self, event: &WarmEvent<'_>) {
        match event {
            WarmEvent::NoAreaToCover => {
                warn!("The region covers no tile at the selected zoom levels, nothing to do");
            }
            WarmEvent::RunStarted {
                total_tiles,
                batches,
                list_only,
            } => {
                let zooms = batches
                    .iter()
                    .map(|(zoom, count)| format!("z{}:{}", zoom, count))
                    .collect::<Vec<_>>()
                    .join(" ");
                let verb = if *list_only { "Listing" } else { "Warming" };
                info!(
                    "{} {} tiles ({})",
                    verb,
                    style(total_tiles).bold().for_stderr(),
                    zooms
                );
            }
            WarmEvent::TileListed { url } => println!("{}", url),
            WarmEvent::BatchStarted {
                zoom,
                tiles,
                concurrency,
                max_retries,
            } => {
                info!(
                    "{} zoom {}: {} tiles, concurrency {}, max retries {}",
                    style("▶").cyan().for_stderr(),
                    zoom,
                    tiles,
                    concurrency,
                    max_retries
                );
            }
            WarmEvent::TileRetry {
                url,
                retry,
                max_retries,
                delay,
                reason,
            } => {
                debug!(
                    "Retry {}/{} for {} in {}: {}",
                    retry,
                    max_retries,
                    url,
                    format_duration(*delay),
                    reason
                );
            }
            WarmEvent::TileSucceeded { outcome, .. } => {
                info!(
                    "{} {} {} {} ({})",
                    style("✓").green().for_stderr(),
                    outcome.status.unwrap_or_default(),
                    outcome.url,
                    format_duration(outcome.response_time),
                    format_bytes(outcome.bytes.unwrap_or(0))
                );
            }
            WarmEvent::TileFailed { outcome, .. } => {
                warn!(
                    "{} {} failed after {} attempt(s): {}",
                    style("✗").red().for_stderr(),
                    outcome.url,
                    outcome.attempts,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
            WarmEvent::Progress(report) => info!("{}", format_progress(report)),
            WarmEvent::BatchFinished {
                zoom,
                totals,
                elapsed,
            } => {
                let failed = if totals.failed > 0 {
                    style(format!("{} failed", totals.failed)).red().for_stderr()
                } else {
                    style("0 failed".to_string()).green().for_stderr()
                };
                info!(
                    "{} zoom {} done: {} tiles, {}, avg response {}, took {}",
                    style("■").cyan().for_stderr(),
                    zoom,
                    totals.processed,
                    failed,
                    format_duration(totals.average_response_time()),
                    format_duration(*elapsed)
                );
            }
            WarmEvent::RunFinished { summary } => {
                if summary.totals.processed == 0 {
                    return;
                }
                info!(
                    "{} {} tiles in {}: {} ok, {} failed, {} retries, {} transferred",
                    style("Finished").bold().for_stderr(),
                    summary.totals.processed,
                    format_duration(summary.elapsed),
                    style(summary.totals.succeeded()).green().for_stderr(),
                    style(summary.failed()).red().for_stderr(),
                    summary.totals.retries(),
                    format_bytes(summary.totals.bytes)
                );
            }
        }
    }
}

/// One progress line: batch position, failures, average and ETAs.
pub fn format_progress(report: &ProgressReport) -> String {
    let percent = if report.total == 0 {
        100.0
    } else {
        report.done as f64 * 100.0 / report.total as f64
    };
    format!(
        "zoom {}: {}/{} ({:.1}%), {} failed, avg response {}, zoom eta {}, run {}/{} eta {}",
        report.zoom,
        report.done,
        report.total,
        percent,
        report.failed,
        format_duration(report.average_response_time),
        format_duration(report.eta),
        report.run_done,
        report.run_total,
        format_duration(report.run_eta)
    )
}

/// Human readable duration: `850ms`, `12.3s`, `4m 05s`, `2h 03m`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs == 0 {
        format!("{}ms", d.as_millis())
    } else if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    }
}

/// Human readable byte count.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{:.1} {}", value, unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(850)), "850ms");
        assert_eq!(format_duration(Duration::from_millis(12_340)), "12.3s");
        assert_eq!(format_duration(Duration::from_secs(245)), "4m 05s");
        assert_eq!(format_duration(Duration::from_secs(7_380)), "2h 03m");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_format_progress() {
        let report = ProgressReport {
            zoom: 12,
            done: 50,
            total: 200,
            failed: 2,
            average_response_time: Duration::from_millis(120),
            eta: Duration::from_secs(30),
            run_done: 250,
            run_total: 1000,
            run_eta: Duration::from_secs(150),
        };
        assert_eq!(
            format_progress(&report),
            "zoom 12: 50/200 (25.0%), 2 failed, avg response 120ms, zoom eta 30.0s, run 250/1000 eta 2m 30s"
        );
    }
}
