//! Forecast loop errors.

use thiserror::Error;

/// Errors raised while setting up a forecast loop.
///
/// Cycle failures are reported through `CycleOutcome`, never as errors.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Invalid forecast config: {0}")]
    InvalidConfig(String),
}

pub type ForecastResult<T> = Result<T, ForecastError>;
