//! Forecast window and point types

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Historical range queried before a forecast cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastWindow {
    /// Window start, epoch seconds
    pub start: i64,

    /// Window end, epoch seconds
    pub end: i64,

    /// Resolution requested from the backend
    pub step: Duration,
}

impl ForecastWindow {
    /// Window ending at `now_ms` and reaching `lookback` into the past.
    pub fn ending_at(now_ms: i64, lookback: Duration, step: Duration) -> Self {
        let end = now_ms.div_euclid(1000);
        let lookback_secs = i64::try_from(lookback.as_secs()).unwrap_or(i64::MAX);
        Self {
            start: end.saturating_sub(lookback_secs),
            end,
            step,
        }
    }
}

/// One row returned by a range query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp_ms: i64,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(timestamp_ms: i64, value: f64) -> Self {
        Self {
            timestamp_ms,
            value,
        }
    }
}

/// One predicted value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp_ms: i64,
    pub yhat: f64,
}

impl ForecastPoint {
    pub fn new(timestamp_ms: i64, yhat: f64) -> Self {
        Self { timestamp_ms, yhat }
    }
}

/// Which forecast points get republished each cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    /// Only the final forecast point
    LastPoint,

    /// Every point beyond the last historical timestamp
    #[default]
    FullTail,
}

impl std::fmt::Display for PublishMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishMode::LastPoint => write!(f, "last_point"),
            PublishMode::FullTail => write!(f, "full_tail"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown publish mode {0:?} (expected last_point or full_tail)")]
pub struct PublishModeParseError(pub String);

impl FromStr for PublishMode {
    type Err = PublishModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last_point" => Ok(PublishMode::LastPoint),
            "full_tail" => Ok(PublishMode::FullTail),
            other => Err(PublishModeParseError(other.to_string())),
        }
    }
}
