//! Telesynth Forecast - Periodic retrain-and-republish of a forecast series
//!
//! Every poll interval a [`ForecastLoop`] queries the lookback window of one
//! series, fits a [`Forecaster`] to it, selects the future points according
//! to the [`PublishMode`](telesynth_types::PublishMode) and republishes them
//! in chunks to every configured publisher.

#![deny(unsafe_code)]

pub mod config;
pub mod cycle;
pub mod error;
pub mod model;
pub mod runner;

pub use config::ForecastConfig;
pub use cycle::{
    forecast_samples, publish_chunks, select_points, CycleOutcome, CycleReport, CycleStage,
    PublishSummary,
};
pub use error::{ForecastError, ForecastResult};
pub use model::{ForecastModel, Forecaster, Seasonality, SeasonalTrendForecaster};
pub use runner::ForecastLoop;
