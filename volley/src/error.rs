use thiserror::Error;
use volley_core::ConfigError;

/// Faults that stop a run as a whole.
///
/// Individual call failures are never represented here; they are recorded as
/// [`CallOutcome`](volley_core::CallOutcome)s and counted.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid workload: {0}")]
    Config(#[from] ConfigError),

    #[error("Unable to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Call task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Run cancelled after {completed} of {total} operations")]
    Cancelled { completed: u64, total: u64 },
}
