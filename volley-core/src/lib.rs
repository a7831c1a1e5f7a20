mod config;
mod constants;
mod outcome;
mod stats;
mod status;

pub use config::*;
pub use constants::*;
pub use outcome::*;
pub use stats::*;
pub use status::*;
