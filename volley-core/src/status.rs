#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use time::OffsetDateTime;

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Live progress of a run, handed to observers as snapshots.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RunStatus {
    pub state: RunState,
    pub progress_percent: f64,
    pub completed_operations: u64,
    pub total_operations: u64,
    #[cfg_attr(feature = "serde", serde(default, with = "time::serde::rfc3339::option"))]
    pub started_at: Option<OffsetDateTime>,
    #[cfg_attr(feature = "serde", serde(default, with = "time::serde::rfc3339::option"))]
    pub ended_at: Option<OffsetDateTime>,
    pub error_message: Option<String>,
}

impl RunStatus {
    pub fn idle(total_operations: u64) -> Self {
        Self {
            total_operations,
            ..Default::default()
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Time spent so far, or the total run time once the run has ended.
    pub fn elapsed(&self) -> Option<Duration> {
        let start = self.started_at?;
        let end = self.ended_at.unwrap_or_else(OffsetDateTime::now_utc);
        Some(Duration::try_from(end - start).unwrap_or_default())
    }

    /// Linear estimate of the time left, based on the elapsed time and the fraction completed.
    pub fn estimated_remaining(&self) -> Option<Duration> {
        if self.state != RunState::Running || self.progress_percent <= 0. {
            return None;
        }

        let elapsed = self.elapsed()?.as_secs_f64();
        let fraction = (self.progress_percent / 100.).min(1.);
        let remaining = elapsed / fraction - elapsed;
        Some(Duration::from_secs_f64(remaining.max(0.)))
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}/{} ({:.1}%)",
            self.state, self.completed_operations, self.total_operations, self.progress_percent
        )?;
        if let Some(err) = &self.error_message {
            write!(f, ": {err}")?;
        }
        Ok(())
    }
}
