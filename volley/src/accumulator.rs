//! Streaming run statistics
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley_core::{CallOutcome, RunStats};

#[cfg(feature = "metrics")]
const SUCCESS_METRIC: &str = "volley_requests_success";
#[cfg(feature = "metrics")]
const ERROR_METRIC: &str = "volley_requests_error";
#[cfg(feature = "metrics")]
const LATENCY_METRIC: &str = "volley_latency_ms";

/// Folds call outcomes into a [`RunStats`].
///
/// Every update is O(1): the mean latency is maintained as a running recurrence rather than
/// recomputed from `response_times`. The accumulator is not synchronized; the scheduler owns it
/// and is the only caller of [`Accumulator::record`].
#[derive(Debug, Default)]
pub struct Accumulator {
    stats: RunStats,
    finalized: bool,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            stats: RunStats::new(),
            finalized: false,
        }
    }

    pub fn record(&mut self, outcome: &CallOutcome) {
        let stats = &mut self.stats;
        let latency = outcome.latency_ms.max(0.);

        stats.total_requests += 1;
        if outcome.success {
            stats.successful_requests += 1;
        } else {
            stats.failed_requests += 1;
        }

        let n = stats.total_requests as f64;
        stats.average_response_time_ms = (stats.average_response_time_ms * (n - 1.) + latency) / n;
        stats.min_response_time_ms = stats.min_response_time_ms.min(latency);
        stats.max_response_time_ms = stats.max_response_time_ms.max(latency);
        stats.response_times.push(latency);

        #[cfg(feature = "metrics")]
        {
            metrics::histogram!(LATENCY_METRIC).record(latency);
            if outcome.success {
                metrics::counter!(SUCCESS_METRIC).increment(1);
            } else {
                metrics::counter!(ERROR_METRIC).increment(1);
            }
        }
    }

    /// Stamp the total run time and derive the request rate. Only the first call has an effect.
    pub fn finalize(&mut self, elapsed: Duration) {
        if self.finalized {
            warn!("Run statistics already finalized; ignoring.");
            return;
        }
        self.finalized = true;

        let total_time_ms = elapsed.as_secs_f64() * 1_000.;
        self.stats.total_time_ms = total_time_ms;
        // NOTE: A zero elapsed time would yield an infinite rate.
        self.stats.requests_per_second = if total_time_ms > 0. {
            self.stats.total_requests as f64 / (total_time_ms / 1_000.)
        } else {
            0.
        };
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn snapshot(&self) -> RunStats {
        self.stats.clone()
    }

    pub fn into_stats(self) -> RunStats {
        self.stats
    }
}
