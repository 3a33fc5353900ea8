//! Error types for telesynth-daemon

use telesynth_forecast::ForecastError;
use telesynth_replay::ReplayError;
use telesynth_types::TransportError;
use thiserror::Error;

/// Errors that end the daemon with a non-zero exit.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Replay error: {0}")]
    Replay(#[from] ReplayError),

    #[error("Forecast error: {0}")]
    Forecast(#[from] ForecastError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Forecast cycle failed: {0}")]
    CycleFailed(String),
}

pub type DaemonResult<T> = Result<T, DaemonError>;
