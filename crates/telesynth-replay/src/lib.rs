//! Telesynth Replay - Synthetic series replayed into metrics backends
//!
//! A [`ReplayScheduler`] walks a [`ReplayPlan`] tick by tick, either over a
//! past window in one go ([`ReplayMode::Backfill`]) or against the wall
//! clock ([`ReplayMode::Live`]), and pushes every tick's batch to all
//! configured publishers.

#![deny(unsafe_code)]

pub mod error;
pub mod plan;
pub mod scheduler;

pub use error::{ReplayError, ReplayResult};
pub use plan::{
    CounterSeries, HistogramSeries, LatencyTarget, LivenessSeries, PatternSeries, ReplayPlan,
    SeriesTarget,
};
pub use scheduler::{ReplayConfig, ReplayMode, ReplayReport, ReplayScheduler, Tick};
