//! Telesynth Types - Core types shared by the generator and forecast pipeline
//!
//! Telesynth produces synthetic telemetry for exercising a metrics backend
//! and republishes model forecasts of existing series. This crate holds the
//! vocabulary both halves speak.
//!
//! ## Key Concepts
//!
//! - **Sample**: one (metric name, label set, value, timestamp) data point
//! - **LabelSet**: content-compared label map, key order irrelevant
//! - **WireSeries**: the JSON shape a publisher pushes to a backend
//! - **Clock / Timer**: injectable time so loops can be driven in tests
//! - **Shutdown**: cooperative cancellation shared by long-running loops

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod duration;
pub mod error;
pub mod forecast;
pub mod sample;
pub mod time;

// Re-export main types
pub use duration::{format_duration, parse_duration, DurationParseError};
pub use error::{ChunkPublishError, ModelFitError, ModelResult, TransportError, TransportResult};
pub use forecast::{ForecastPoint, ForecastWindow, PublishMode, PublishModeParseError, SeriesPoint};
pub use sample::{LabelSet, Sample, WireSeries, METRIC_NAME_LABEL};
pub use time::{Clock, ManualClock, Shutdown, ShutdownTrigger, SystemClock, Timer, TokioTimer};
