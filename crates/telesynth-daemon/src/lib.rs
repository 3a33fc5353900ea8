//! Telesynth Daemon library
//!
//! Wires the replay scheduler and the forecast loop to HTTP collaborators,
//! the system clock and process signals:
//! - `telesynth generate`: backfill or live replay of the standard plan
//! - `telesynth forecast`: periodic retrain-and-republish

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod shutdown;
pub mod telemetry;

pub use cli::Cli;
pub use error::{DaemonError, DaemonResult};
