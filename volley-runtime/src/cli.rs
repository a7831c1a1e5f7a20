//! Command line interface
use crate::error::RuntimeError;
use crate::history::{HistoryStore, DEFAULT_DATA_DIR};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;
use volley_core::{Method, WorkloadConfig};

#[derive(Parser, Debug)]
#[command(name = "volley", version, about = "Bounded-concurrency HTTP load testing")]
pub struct VolleyCli {
    /// Directory holding the saved config and result history.
    #[arg(long, env = "VOLLEY_DATA_DIR", default_value = DEFAULT_DATA_DIR, global = true)]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a load test.
    Run(RunArgs),

    /// List stored results, newest first.
    History,

    /// Print the full report of a stored result.
    Show { id: Uuid },

    /// Delete a stored result.
    Delete { id: Uuid },

    /// Write all stored results to a JSON file.
    Export { path: Option<PathBuf> },
}

/// Workload flags. Anything not given falls back to `--config`, then to the last saved config.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// JSON file describing the workload.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(short, long)]
    pub endpoint: Option<String>,

    #[arg(short = 'X', long)]
    pub method: Option<Method>,

    /// Extra request header, `Name: value`. May be repeated.
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    #[arg(short, long)]
    pub body: Option<String>,

    /// Bearer token sent with every call.
    #[arg(long, env = "VOLLEY_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Total number of calls.
    #[arg(short = 'n', long)]
    pub operations: Option<u64>,

    /// Maximum calls in flight at once.
    #[arg(short, long)]
    pub concurrency: Option<u64>,

    /// Per-call timeout, e.g. `10s` or `500ms`.
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Do not store the config or the result.
    #[arg(long)]
    pub no_save: bool,
}

impl RunArgs {
    /// Build the workload from the config file or saved config, then apply flag overrides.
    pub fn resolve(&self, store: &HistoryStore) -> Result<WorkloadConfig, RuntimeError> {
        let base = match &self.config {
            Some(path) => Some(serde_json::from_slice(&std::fs::read(path)?)?),
            None => store.load_config(),
        };

        let mut config = match (base, &self.endpoint) {
            (Some(mut config), Some(endpoint)) => {
                config.endpoint = endpoint.clone();
                config
            }
            (Some(config), None) => config,
            (None, Some(endpoint)) => WorkloadConfig::new(endpoint),
            (None, None) => return Err(RuntimeError::MissingEndpoint),
        };

        if let Some(method) = self.method {
            config.method = method;
        }
        for (name, value) in &self.headers {
            config.headers.insert(name.clone(), value.clone());
        }
        if let Some(body) = &self.body {
            config.body = Some(body.clone());
        }
        if let Some(token) = &self.token {
            config.auth_token = Some(token.clone());
        }
        if let Some(operations) = self.operations {
            config.total_operations = operations;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }

        Ok(config)
    }
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: value`, got `{s}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing header name in `{s}`"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
