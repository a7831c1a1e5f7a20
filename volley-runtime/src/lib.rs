//! Command line runtime for Volley.
//!
//! Wraps the engine with the pieces a usable tool needs around it: argument parsing, loading a
//! workload from disk, rendering progress and reports, and keeping a small history of past runs.
pub mod cli;
pub mod history;
pub mod report;
pub mod runtime;

mod error;

pub use crate::error::RuntimeError;
pub use crate::history::{HistoryStore, RunRecord};
pub use crate::runtime::VolleyRuntime;
