use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("No endpoint given and no saved config found")]
    MissingEndpoint,

    #[error("Invalid workload: {0}")]
    Config(#[from] volley_core::ConfigError),

    #[error(transparent)]
    Engine(#[from] volley::RunError),

    #[error("No stored result with id {0}")]
    NotFound(Uuid),

    #[error("Run failed: {0}")]
    RunFailed(String),

    #[error("Run task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
