//! Telesynth Signal - Synthetic waveform generation
//!
//! - [`patterns`]: deterministic and randomized waveform shapes
//! - [`mask`]: scrape-gap windows for the liveness series
//! - [`histogram`]: cumulative histogram bucketization of latency draws

#![deny(unsafe_code)]

pub mod histogram;
pub mod mask;
pub mod patterns;

pub use histogram::{
    format_bucket_bound, BucketCount, HistogramAggregator, HistogramError, HistogramResult,
    HistogramSnapshot, HistogramSpec, LatencyModel, INF_BOUND, LE_LABEL,
};
pub use mask::{is_missing_scrape, Gap, MissingScrapeMask};
pub use patterns::{
    Bursts, Exponential, GaussianNoise, MultiFrequency, PatternInput, PatternKind, QuadraticRamp,
    Sawtooth, Sinusoid, Spikes, StepLevels, DEFAULT_HORIZON,
};
