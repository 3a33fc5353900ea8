//! Forecast loop configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use telesynth_types::PublishMode;

use crate::error::{ForecastError, ForecastResult};

/// Forecast loop configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Range query expression
    #[serde(default = "default_query")]
    pub query: String,

    /// How far back each cycle queries
    #[serde(default = "default_lookback")]
    pub lookback: Duration,

    /// Resolution requested from the backend
    #[serde(default = "default_step")]
    pub step: Duration,

    /// Number of future points predicted each cycle
    #[serde(default = "default_predict_period")]
    pub predict_period: usize,

    #[serde(default)]
    pub publish_mode: PublishMode,

    /// Samples per publish request
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Delay between cycles
    #[serde(default = "default_poll_interval")]
    pub poll_interval: Duration,

    /// Output metric name; `<query>_forecast` when unset
    #[serde(default)]
    pub metric_name: Option<String>,

    /// Value of the `job` label on published points
    #[serde(default = "default_job")]
    pub job: String,
}

fn default_query() -> String {
    "http_request_latency".to_string()
}

fn default_lookback() -> Duration {
    Duration::from_secs(3600)
}

fn default_step() -> Duration {
    Duration::from_secs(1)
}

fn default_predict_period() -> usize {
    3600
}

fn default_chunk_size() -> usize {
    1000
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_job() -> String {
    "forecast".to_string()
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            query: default_query(),
            lookback: default_lookback(),
            step: default_step(),
            predict_period: default_predict_period(),
            publish_mode: PublishMode::default(),
            chunk_size: default_chunk_size(),
            poll_interval: default_poll_interval(),
            metric_name: None,
            job: default_job(),
        }
    }
}

impl ForecastConfig {
    /// Name of the published forecast series.
    pub fn forecast_metric(&self) -> String {
        self.metric_name
            .clone()
            .unwrap_or_else(|| format!("{}_forecast", self.query))
    }

    pub fn validate(&self) -> ForecastResult<()> {
        if self.query.trim().is_empty() {
            return Err(ForecastError::InvalidConfig(
                "query must not be empty".to_string(),
            ));
        }
        if self.lookback.is_zero() {
            return Err(ForecastError::InvalidConfig(
                "lookback must be positive".to_string(),
            ));
        }
        if self.step.is_zero() || self.step.subsec_nanos() != 0 {
            return Err(ForecastError::InvalidConfig(format!(
                "step must be a whole number of seconds, got {:?}",
                self.step
            )));
        }
        if self.predict_period == 0 {
            return Err(ForecastError::InvalidConfig(
                "predict period must be positive".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(ForecastError::InvalidConfig(
                "chunk size must be positive".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(ForecastError::InvalidConfig(
                "poll interval must be positive".to_string(),
            ));
        }
        if matches!(&self.metric_name, Some(name) if name.is_empty()) {
            return Err(ForecastError::InvalidConfig(
                "forecast metric name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
