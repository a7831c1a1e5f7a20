//! Human readable output for runs and stored results
use crate::history::RunRecord;
use std::fmt::Write;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley_core::{RunState, RunStats, RunStatus};

const PROGRESS_STEP_PERCENT: f64 = 10.;

/// How a success rate is labelled in listings.
pub fn grade(success_rate: f64) -> &'static str {
    match success_rate {
        x if x > 90. => "good",
        x if x > 70. => "fair",
        _ => "poor",
    }
}

pub fn render_report(stats: &RunStats) -> String {
    let mut out = String::new();
    let rate = stats.success_rate();

    // NOTE: Writing to a String cannot fail.
    let _ = writeln!(out, "Requests      {}", stats.total_requests);
    let _ = writeln!(
        out,
        "Success rate  {rate:.1}% ({}) [{} ok / {} failed]",
        grade(rate),
        stats.successful_requests,
        stats.failed_requests
    );
    let _ = writeln!(
        out,
        "Latency       avg {:.2}ms | min {:.2}ms | max {:.2}ms",
        stats.average_response_time_ms,
        finite_or_zero(stats.min_response_time_ms),
        stats.max_response_time_ms
    );
    if let (Some(p50), Some(p90), Some(p99)) = (
        stats.percentile(0.5),
        stats.percentile(0.9),
        stats.percentile(0.99),
    ) {
        let _ = writeln!(
            out,
            "Percentiles   p50 {p50:.2}ms | p90 {p90:.2}ms | p99 {p99:.2}ms"
        );
    }
    let _ = writeln!(out, "Throughput    {:.2} req/s", stats.requests_per_second);
    let _ = write!(
        out,
        "Total time    {}",
        format_duration(stats.total_time())
    );
    out
}

pub fn render_history(records: &[RunRecord]) -> String {
    if records.is_empty() {
        return "No stored results.".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<36}  {:<20}  {:>8}  {:>8}  {:>10}  ENDPOINT",
        "ID", "DATE", "OPS", "SUCCESS", "AVG"
    );
    for record in records {
        let stats = &record.stats;
        let date = record
            .timestamp
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| record.timestamp.to_string());
        let _ = writeln!(
            out,
            "{:<36}  {:<20.20}  {:>8}  {:>7.1}%  {:>8.2}ms  {}",
            record.id,
            date,
            record.config.total_operations,
            stats.success_rate(),
            stats.average_response_time_ms,
            record.config.endpoint
        );
    }
    out.trim_end().to_string()
}

/// Logs progress at fixed percentage steps instead of on every call.
#[derive(Debug)]
pub struct ProgressReporter {
    next_mark: f64,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            next_mark: PROGRESS_STEP_PERCENT,
        }
    }

    /// Returns the rendered line when this status crossed a reporting step.
    pub fn update(&mut self, status: &RunStatus) -> Option<String> {
        match status.state {
            RunState::Running if status.progress_percent >= self.next_mark => {
                while self.next_mark <= status.progress_percent {
                    self.next_mark += PROGRESS_STEP_PERCENT;
                }
                let line = render_progress(status);
                info!("{line}");
                Some(line)
            }
            RunState::Completed | RunState::Failed => {
                let line = render_progress(status);
                info!("{line}");
                Some(line)
            }
            _ => None,
        }
    }
}

pub fn render_progress(status: &RunStatus) -> String {
    let mut line = status.to_string();
    if let Some(elapsed) = status.elapsed() {
        let _ = write!(line, " elapsed {}", format_duration(elapsed));
    }
    if let Some(remaining) = status.estimated_remaining() {
        let _ = write!(line, ", ~{} remaining", format_duration(remaining));
    }
    line
}

/// Millisecond precision duration, e.g. `1s 250ms`.
pub fn format_duration(dur: Duration) -> String {
    let millis = Duration::from_millis(dur.as_millis() as u64);
    if millis.is_zero() {
        return "0ms".to_string();
    }
    humantime::format_duration(millis).to_string()
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.
    }
}
