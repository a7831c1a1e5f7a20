#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod accumulator;
pub mod executor;
pub mod hooks;
pub mod runner;

mod error;

pub use accumulator::Accumulator;
pub use error::RunError;
pub use executor::{Executor, HttpExecutor};
pub use hooks::{Callbacks, RunEvent, RunHooks};
pub use runner::{run, waves, Runner, Waves};
pub use volley_core as core;

pub mod prelude {
    pub use crate::executor::{Executor, HttpExecutor};
    pub use crate::hooks::{Callbacks, RunEvent, RunHooks};
    pub use crate::runner::Runner;
    pub use tokio_util::sync::CancellationToken;
    pub use volley_core::{
        CallOutcome, Method, RunState, RunStats, RunStatus, WorkloadConfig,
    };
}
