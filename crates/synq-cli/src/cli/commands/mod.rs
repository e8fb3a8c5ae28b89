//! CLI command handlers, one file per command group.

mod clear;
mod enqueue;
mod run;
mod status;

pub use clear::{run_clear, run_unlock};
pub use enqueue::{preference_command, run_enqueue};
pub use run::run_service;
pub use status::run_status;
