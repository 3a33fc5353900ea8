//! Replay errors.

use telesynth_signal::HistogramError;
use thiserror::Error;

/// Errors that stop a replay before or during its run.
///
/// Push failures are not errors here; they are counted in the report.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Invalid replay config: {0}")]
    InvalidConfig(String),

    #[error("Invalid replay plan: {0}")]
    InvalidPlan(String),

    #[error("Histogram error: {0}")]
    Histogram(#[from] HistogramError),
}

pub type ReplayResult<T> = Result<T, ReplayError>;
