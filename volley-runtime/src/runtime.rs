//! Command dispatch for the `volley` binary
use crate::cli::{Command, RunArgs, VolleyCli};
use crate::error::RuntimeError;
use crate::history::{export_file_name, HistoryStore, RunRecord};
use crate::report::{render_history, render_report, ProgressReporter};
use clap::Parser;
use std::path::PathBuf;
use time::OffsetDateTime;
use tokio::sync::mpsc::unbounded_channel;
#[allow(unused)]
use tracing::{debug, error, info, instrument, warn, Instrument};
use volley::{HttpExecutor, RunError, RunEvent, Runner};
use volley_core::{RunStats, WorkloadConfig};

/// Default log filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "volley=info,volley_runtime=info";

/// Runs one CLI command against a history directory.
///
/// # Example
///
/// ```ignore
/// use volley_runtime::VolleyRuntime;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let output = VolleyRuntime::with_args().run().await?;
///     println!("{output}");
///     Ok(())
/// }
/// ```
pub struct VolleyRuntime {
    store: HistoryStore,
    command: Command,
}

impl VolleyRuntime {
    pub fn new(data_dir: impl Into<PathBuf>, command: Command) -> Self {
        Self {
            store: HistoryStore::new(data_dir),
            command,
        }
    }

    /// Parse the process arguments.
    pub fn with_args() -> Self {
        Self::from_cli(VolleyCli::parse())
    }

    pub fn from_cli(cli: VolleyCli) -> Self {
        Self::new(cli.data_dir, cli.command)
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Execute the command, returning what should be printed.
    #[instrument(name = "volley", skip_all, fields(data_dir = %self.store.dir().display()))]
    pub async fn run(self) -> Result<String, RuntimeError> {
        match self.command {
            Command::Run(args) => {
                let (_, stats) = run_workload(&self.store, &args).await?;
                Ok(render_report(&stats))
            }
            Command::History => Ok(render_history(&self.store.load_results())),
            Command::Show { id } => {
                let record = self.store.find(id).ok_or(RuntimeError::NotFound(id))?;
                Ok(format!(
                    "{} {} x{} (concurrency {})\n{}",
                    record.config.method,
                    record.config.endpoint,
                    record.config.total_operations,
                    record.config.concurrency,
                    render_report(&record.stats)
                ))
            }
            Command::Delete { id } => {
                if self.store.delete_result(id)? {
                    Ok(format!("Deleted {id}"))
                } else {
                    Err(RuntimeError::NotFound(id))
                }
            }
            Command::Export { path } => {
                let path = path.unwrap_or_else(|| {
                    PathBuf::from(export_file_name(OffsetDateTime::now_utc().date()))
                });
                let count = self.store.export(&path)?;
                Ok(format!("Exported {count} results to {}", path.display()))
            }
        }
    }
}

/// Resolve and run a workload, then persist it unless `--no-save` was given.
///
/// Returns the stored record id (if saved) and the final statistics.
pub async fn run_workload(
    store: &HistoryStore,
    args: &RunArgs,
) -> Result<(Option<uuid::Uuid>, RunStats), RuntimeError> {
    let config = args.resolve(store)?;
    config.validate()?;

    let executor = match args.timeout {
        Some(timeout) => HttpExecutor::with_timeout(timeout),
        None => HttpExecutor::new(),
    }
    .map_err(RunError::from)?;

    let stats = execute(Runner::new(executor), config.clone()).await?;

    if args.no_save {
        return Ok((None, stats));
    }

    store.save_config(&config)?;
    let record = RunRecord::new(config, stats.clone());
    let id = record.id;
    store.save_result(record)?;
    info!("Saved result {id}");

    Ok((Some(id), stats))
}

async fn execute(
    runner: Runner<HttpExecutor>,
    config: WorkloadConfig,
) -> Result<RunStats, RuntimeError> {
    let cancel = runner.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; stopping after the current wave.");
            cancel.cancel();
        }
    });

    let (tx, mut rx) = unbounded_channel();
    let handle = tokio::spawn(async move { runner.run(config, tx).await }.in_current_span());

    let mut reporter = ProgressReporter::new();
    let mut result = None;
    while let Some(event) = rx.recv().await {
        match event {
            RunEvent::Progress(status) => {
                reporter.update(&status);
            }
            RunEvent::Complete(stats) => result = Some(Ok(stats)),
            RunEvent::Error(message) => result = Some(Err(RuntimeError::RunFailed(message))),
        }
    }

    interrupt.abort();
    handle.await?;

    result.unwrap_or_else(|| Err(RuntimeError::RunFailed("run ended without a result".to_string())))
}
