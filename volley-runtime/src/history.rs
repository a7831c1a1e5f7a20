//! Result history kept on local disk
use crate::error::RuntimeError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use time::{Date, OffsetDateTime};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;
use volley_core::{RunStats, WorkloadConfig, AUTHORIZATION_HEADER};

pub const DEFAULT_DATA_DIR: &str = ".volley";

const CONFIG_FILE: &str = "config.json";
const RESULTS_FILE: &str = "results.json";
const MAX_RESULTS: usize = 20;

/// A completed run as stored in the history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub config: WorkloadConfig,
    pub stats: RunStats,
}

impl RunRecord {
    /// Record for a finished run. The auth token is never written to disk.
    pub fn new(config: WorkloadConfig, stats: RunStats) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: OffsetDateTime::now_utc(),
            config: redacted(config),
            stats,
        }
    }
}

/// JSON backed store for the last used workload and the most recent results.
///
/// Unreadable files are treated as empty so a corrupted history never blocks a run.
#[derive(Clone, Debug)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save_config(&self, config: &WorkloadConfig) -> Result<(), RuntimeError> {
        self.write_json(CONFIG_FILE, &redacted(config.clone()))
    }

    pub fn load_config(&self) -> Option<WorkloadConfig> {
        self.read_json(CONFIG_FILE)
    }

    /// Prepend a result, keeping only the newest entries.
    pub fn save_result(&self, record: RunRecord) -> Result<(), RuntimeError> {
        let mut results = self.load_results();
        results.insert(0, record);
        results.truncate(MAX_RESULTS);
        self.write_json(RESULTS_FILE, &results)
    }

    /// Stored results, newest first.
    pub fn load_results(&self) -> Vec<RunRecord> {
        self.read_json(RESULTS_FILE).unwrap_or_default()
    }

    pub fn find(&self, id: Uuid) -> Option<RunRecord> {
        self.load_results().into_iter().find(|r| r.id == id)
    }

    /// Remove a result. Returns whether anything was removed.
    pub fn delete_result(&self, id: Uuid) -> Result<bool, RuntimeError> {
        let mut results = self.load_results();
        let before = results.len();
        results.retain(|r| r.id != id);

        if results.len() == before {
            return Ok(false);
        }
        self.write_json(RESULTS_FILE, &results)?;
        Ok(true)
    }

    /// Write every stored result to `path` as pretty printed JSON. Returns the number exported.
    pub fn export(&self, path: &Path) -> Result<usize, RuntimeError> {
        let results = self.load_results();
        let json = serde_json::to_string_pretty(&results)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        info!("Exported {} results to {}", results.len(), path.display());
        Ok(results.len())
    }

    fn write_json<T: Serialize>(&self, file: &str, value: &T) -> Result<(), RuntimeError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
        fs::rename(&tmp, &path)?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, file: &str) -> Option<T> {
        let path = self.dir.join(file);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!("Unable to read {}: {err}", path.display());
                return None;
            }
        };

        match serde_json::from_slice(&data) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Ignoring unparsable {}: {err}", path.display());
                None
            }
        }
    }
}

/// Default export file name for a given day, e.g. `volley-results-2024-03-09.json`.
pub fn export_file_name(date: Date) -> String {
    format!(
        "volley-results-{}-{:02}-{:02}.json",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Credentials are never persisted, whether given as a token or as a raw header.
fn redacted(mut config: WorkloadConfig) -> WorkloadConfig {
    config.auth_token = None;
    config
        .headers
        .retain(|name, _| !name.eq_ignore_ascii_case(AUTHORIZATION_HEADER));
    config
}
