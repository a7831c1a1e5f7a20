#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Aggregate statistics of a run.
///
/// Counters and latency extremes are updated as outcomes arrive. `total_time_ms` and
/// `requests_per_second` are only meaningful once the run reached a terminal state.
///
/// `response_times` holds one entry per completed call in completion order, which is not the
/// order calls were dispatched in.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RunStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_response_time_ms: f64,
    pub min_response_time_ms: f64,
    pub max_response_time_ms: f64,
    pub total_time_ms: f64,
    pub requests_per_second: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub response_times: Vec<f64>,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            average_response_time_ms: 0.,
            min_response_time_ms: f64::INFINITY,
            max_response_time_ms: 0.,
            total_time_ms: 0.,
            requests_per_second: 0.,
            response_times: vec![],
        }
    }

    /// Percentage of successful requests, `0.` when nothing ran.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.;
        }
        self.successful_requests as f64 / self.total_requests as f64 * 100.
    }

    /// Nearest-rank latency quantile in milliseconds, `quantile` in `[0, 1]`.
    pub fn percentile(&self, quantile: f64) -> Option<f64> {
        if self.response_times.is_empty() {
            return None;
        }

        let mut sorted = self.response_times.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let quantile = quantile.clamp(0., 1.);
        let rank = (quantile * sorted.len() as f64).ceil() as usize;
        Some(sorted[rank.saturating_sub(1).min(sorted.len() - 1)])
    }

    pub fn total_time(&self) -> Duration {
        Duration::from_secs_f64(self.total_time_ms.max(0.) / 1_000.)
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Requests={} (ok={}, failed={}), SuccessRate={:.1}%, Avg={:.2}ms, RPS={:.2}",
            self.total_requests,
            self.successful_requests,
            self.failed_requests,
            self.success_rate(),
            self.average_response_time_ms,
            self.requests_per_second,
        )
    }
}
