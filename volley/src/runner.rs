//! Batch scheduler: runs a workload in concurrency-bounded waves
use crate::accumulator::Accumulator;
use crate::error::RunError;
use crate::executor::{Executor, HttpExecutor};
use crate::hooks::RunHooks;
use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};
use volley_core::{CallOutcome, ConfigError, RunState, RunStatus, WorkloadConfig};

/// Run a workload with a default [`HttpExecutor`].
///
/// If the HTTP client cannot be built the run still starts and then fails through
/// [`RunHooks::on_error`].
pub async fn run<H: RunHooks>(config: WorkloadConfig, hooks: H) {
    match HttpExecutor::new() {
        Ok(executor) => Runner::new(executor).run(config, hooks).await,
        Err(err) => {
            error!("Unable to build HTTP client: {err}");
            Run::start(config.total_operations, hooks).fail(RunError::Client(err));
        }
    }
}

/// Split `[0, total)` into consecutive waves of at most `concurrency` operations.
///
/// ```
/// let sizes: Vec<_> = volley::waves(10, 3).unwrap().map(|w| w.end - w.start).collect();
/// assert_eq!(sizes, vec![3, 3, 3, 1]);
/// ```
pub fn waves(total: u64, concurrency: u64) -> Result<Waves, RunError> {
    if concurrency == 0 {
        return Err(ConfigError::ZeroConcurrency.into());
    }
    Ok(Waves {
        next: 0,
        total,
        concurrency,
    })
}

#[derive(Debug, Clone)]
pub struct Waves {
    next: u64,
    total: u64,
    concurrency: u64,
}

impl Iterator for Waves {
    type Item = Range<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total {
            return None;
        }
        let start = self.next;
        let end = start.saturating_add(self.concurrency).min(self.total);
        self.next = end;
        Some(start..end)
    }
}

/// Drives a workload through an [`Executor`].
///
/// Each wave dispatches its calls as independent tasks and fully drains before the next wave
/// starts, so no more than `concurrency` calls are ever in flight. Outcomes are folded into the
/// run statistics by this scheduler alone, in completion order.
///
/// # Example
/// ```no_run
/// use volley::prelude::*;
///
/// # async fn example() -> Result<(), reqwest::Error> {
/// let runner = Runner::new(HttpExecutor::new()?);
/// let cancel = runner.cancel_token();
///
/// let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
/// let config = WorkloadConfig::new("http://127.0.0.1:3002/ok").operations(100).concurrency(10);
/// tokio::spawn(async move { runner.run(config, tx).await });
///
/// while let Some(event) = rx.recv().await {
///     if let RunEvent::Progress(status) = event {
///         if status.progress_percent > 50. {
///             cancel.cancel();
///         }
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct Runner<E> {
    executor: Arc<E>,
    cancel: CancellationToken,
}

impl<E: Executor> Runner<E> {
    pub fn new(executor: E) -> Self {
        Self::from_arc(Arc::new(executor))
    }

    pub fn from_arc(executor: Arc<E>) -> Self {
        Self {
            executor,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token checked between waves. Cancelling it lets the current wave finish and then fails the
    /// run.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[instrument(name = "run", skip_all, fields(endpoint = %config.endpoint))]
    pub async fn run<H: RunHooks>(&self, config: WorkloadConfig, hooks: H) {
        info!(
            "Running {} x{} with concurrency {}",
            config.method, config.total_operations, config.concurrency
        );

        let mut run = Run::start(config.total_operations, hooks);
        match self.drive(config, &mut run).await {
            Ok(()) => run.complete(),
            Err(err) => run.fail(err),
        }
    }

    async fn drive<H: RunHooks>(
        &self,
        config: WorkloadConfig,
        run: &mut Run<H>,
    ) -> Result<(), RunError> {
        config.validate()?;

        let total = config.total_operations;
        let wave_count = config.wave_count();
        let config = Arc::new(config);

        for (idx, wave) in waves(total, config.concurrency)?.enumerate() {
            if self.cancel.is_cancelled() {
                return Err(RunError::Cancelled {
                    completed: run.completed(),
                    total,
                });
            }

            debug!(
                "Wave {}/{wave_count}: dispatching operations {}..{}",
                idx + 1,
                wave.start,
                wave.end
            );

            let mut calls = JoinSet::new();
            for _ in wave {
                let executor = self.executor.clone();
                let config = config.clone();
                calls.spawn(async move { executor.execute(&config).await }.in_current_span());
            }

            while let Some(res) = calls.join_next().await {
                run.record(res?);
            }
        }

        Ok(())
    }
}

/// State of one run. The only writer of its status and statistics.
///
/// Terminal transitions consume the run, so nothing can be emitted after them.
struct Run<H> {
    status: RunStatus,
    accumulator: Accumulator,
    hooks: H,
    started: Instant,
}

impl<H: RunHooks> Run<H> {
    fn start(total_operations: u64, mut hooks: H) -> Self {
        // NOTE: Both clocks are read before any hook runs so a slow observer counts as run time.
        let started = Instant::now();
        let status = RunStatus {
            state: RunState::Running,
            progress_percent: 0.,
            completed_operations: 0,
            total_operations,
            started_at: Some(OffsetDateTime::now_utc()),
            ended_at: None,
            error_message: None,
        };
        hooks.on_progress(status.clone());

        Self {
            status,
            accumulator: Accumulator::new(),
            hooks,
            started,
        }
    }

    /// Stamp `ended_at` from the same monotonic measurement that is returned.
    fn end(&mut self) -> Duration {
        let elapsed = self.started.elapsed();
        self.status.ended_at = self.status.started_at.map(|started_at| started_at + elapsed);
        elapsed
    }

    fn completed(&self) -> u64 {
        self.status.completed_operations
    }

    fn record(&mut self, outcome: CallOutcome) {
        match &outcome.error_message {
            Some(err) => trace!("Call failed after {:.2}ms: {err}", outcome.latency_ms),
            None => trace!(
                "Call finished in {:.2}ms (status {:?})",
                outcome.latency_ms,
                outcome.status
            ),
        }

        self.accumulator.record(&outcome);

        self.status.completed_operations += 1;
        self.status.progress_percent = (self.status.completed_operations as f64
            / self.status.total_operations as f64
            * 100.)
            .min(100.);

        self.hooks.on_progress(self.status.clone());
    }

    fn complete(mut self) {
        let elapsed = self.end();
        self.status.state = RunState::Completed;
        self.status.progress_percent = 100.;
        self.accumulator.finalize(elapsed);

        let stats = self.accumulator.into_stats();
        info!("Run complete: {stats}");

        self.hooks.on_progress(self.status.clone());
        self.hooks.on_complete(stats);
    }

    fn fail(mut self, err: RunError) {
        let message = err.to_string();
        error!("Run failed: {message}");

        self.end();
        self.status.state = RunState::Failed;
        self.status.error_message = Some(message.clone());

        self.hooks.on_progress(self.status.clone());
        self.hooks.on_error(message);
    }
}
