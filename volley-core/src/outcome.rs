use crate::SUCCESS_STATUS_RANGE;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Terminal result of a single call attempt.
///
/// A call either produced a response (successful or not, depending on its status) or failed at
/// the transport level before a response was received. Both kinds are timed.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CallOutcome {
    pub success: bool,
    pub latency_ms: f64,
    pub status: Option<u16>,
    pub error_message: Option<String>,
}

impl CallOutcome {
    /// The server responded. Success is decided by the status alone.
    pub fn response(status: u16, latency: Duration) -> Self {
        Self {
            success: SUCCESS_STATUS_RANGE.contains(&status),
            latency_ms: duration_ms(latency),
            status: Some(status),
            error_message: None,
        }
    }

    /// The call could not complete.
    pub fn transport_error(message: impl Into<String>, latency: Duration) -> Self {
        Self {
            success: false,
            latency_ms: duration_ms(latency),
            status: None,
            error_message: Some(message.into()),
        }
    }

    pub fn is_transport_error(&self) -> bool {
        self.error_message.is_some()
    }
}

pub(crate) fn duration_ms(dur: Duration) -> f64 {
    dur.as_secs_f64() * 1_000.
}
