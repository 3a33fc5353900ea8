//! Cumulative histogram aggregation.
//!
//! Turns one tick's latency draws into the classic histogram sample set:
//! `<base>_bucket{le="..."}` per boundary plus `le="+Inf"`, `<base>_sum` and
//! `<base>_count`. Bucket counts are cumulative.

use rand::Rng;
use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};
use telesynth_types::{LabelSet, Sample};
use thiserror::Error;

/// Label carrying the bucket boundary.
pub const LE_LABEL: &str = "le";

/// Boundary label of the synthetic overflow bucket.
pub const INF_BOUND: &str = "+Inf";

/// Errors building histogram inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HistogramError {
    #[error("bucket boundary {index} is not finite: {value}")]
    NonFinite { index: usize, value: f64 },

    #[error("bucket boundary {index} ({value}) does not exceed the previous boundary ({previous})")]
    NotAscending {
        index: usize,
        previous: f64,
        value: f64,
    },

    #[error("latency rate must be positive and finite, got {0}")]
    InvalidRate(f64),
}

/// Result type for histogram operations.
pub type HistogramResult<T> = Result<T, HistogramError>;

/// Strictly ascending, finite bucket boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct HistogramSpec {
    bounds: Vec<f64>,
}

impl HistogramSpec {
    pub fn new(bounds: Vec<f64>) -> HistogramResult<Self> {
        for (index, &value) in bounds.iter().enumerate() {
            if !value.is_finite() {
                return Err(HistogramError::NonFinite { index, value });
            }
            if index > 0 && value <= bounds[index - 1] {
                return Err(HistogramError::NotAscending {
                    index,
                    previous: bounds[index - 1],
                    value,
                });
            }
        }
        Ok(Self { bounds })
    }

    /// Request-latency buckets in seconds.
    pub fn latency_seconds() -> Self {
        Self {
            bounds: vec![0.1, 0.3, 0.5, 1.0, 2.5, 5.0],
        }
    }

    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }
}

impl Default for HistogramSpec {
    fn default() -> Self {
        Self::latency_seconds()
    }
}

impl TryFrom<Vec<f64>> for HistogramSpec {
    type Error = HistogramError;

    fn try_from(bounds: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(bounds)
    }
}

impl From<HistogramSpec> for Vec<f64> {
    fn from(spec: HistogramSpec) -> Self {
        spec.bounds
    }
}

/// Cumulative count at one boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketCount {
    pub le: f64,
    pub cumulative: u64,
}

/// Aggregated view of one batch of draws.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    pub buckets: Vec<BucketCount>,

    /// Count of the `+Inf` bucket; always equals `count`
    pub inf_count: u64,

    pub sum: f64,

    pub count: u64,
}

impl HistogramSnapshot {
    /// Bucketize `draws` against `spec`.
    pub fn observe(spec: &HistogramSpec, draws: &[f64]) -> Self {
        let buckets = spec
            .bounds()
            .iter()
            .map(|&le| BucketCount {
                le,
                cumulative: draws.iter().filter(|&&d| d <= le).count() as u64,
            })
            .collect();

        let count = draws.len() as u64;
        Self {
            buckets,
            inf_count: count,
            sum: draws.iter().sum(),
            count,
        }
    }

    /// Render as samples sharing `labels`, all stamped `timestamp_ms`.
    pub fn to_samples(&self, base: &str, labels: &LabelSet, timestamp_ms: i64) -> Vec<Sample> {
        let bucket_name = format!("{}_bucket", base);
        let mut samples = Vec::with_capacity(self.buckets.len() + 3);

        for bucket in &self.buckets {
            samples.push(Sample::new(
                bucket_name.clone(),
                labels.clone().with(LE_LABEL, format_bucket_bound(bucket.le)),
                bucket.cumulative as f64,
                timestamp_ms,
            ));
        }

        samples.push(Sample::new(
            bucket_name,
            labels.clone().with(LE_LABEL, INF_BOUND),
            self.inf_count as f64,
            timestamp_ms,
        ));
        samples.push(Sample::new(
            format!("{}_sum", base),
            labels.clone(),
            self.sum,
            timestamp_ms,
        ));
        samples.push(Sample::new(
            format!("{}_count", base),
            labels.clone(),
            self.count as f64,
            timestamp_ms,
        ));

        samples
    }
}

/// Render a boundary as an `le` label value.
///
/// Shortest round-trip decimal; integral values keep a trailing `.0`, and
/// magnitudes outside `[1e-4, 1e16)` use a signed two-digit exponent
/// (`1e-05`, `1e+16`).
pub fn format_bucket_bound(bound: f64) -> String {
    if bound.is_nan() {
        return "NaN".to_string();
    }
    if bound.is_infinite() {
        return if bound > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }

    let magnitude = bound.abs();
    if magnitude == 0.0 || (1e-4..1e16).contains(&magnitude) {
        let mut rendered = format!("{}", bound);
        if !rendered.contains('.') {
            rendered.push_str(".0");
        }
        return rendered;
    }

    let rendered = format!("{:e}", bound);
    match rendered.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exponent.abs())
        }
        None => rendered,
    }
}

/// Exponentially distributed latency draws.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyModel {
    /// Rate of the exponential before the per-target multiplier
    pub base_rate: f64,

    /// Draws per tick
    pub draws: usize,
}

impl Default for LatencyModel {
    fn default() -> Self {
        Self {
            base_rate: 2.0,
            draws: 100,
        }
    }
}

impl LatencyModel {
    /// Draw latencies with rate `base_rate * multiplier`.
    pub fn sample<R: Rng + ?Sized>(&self, multiplier: f64, rng: &mut R) -> HistogramResult<Vec<f64>> {
        let rate = self.base_rate * multiplier;
        if !(rate.is_finite() && rate > 0.0) {
            return Err(HistogramError::InvalidRate(rate));
        }
        let exp = Exp::new(rate).map_err(|_| HistogramError::InvalidRate(rate))?;
        Ok((0..self.draws).map(|_| exp.sample(rng)).collect())
    }
}

/// Draws latencies and bucketizes them in one step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramAggregator {
    #[serde(default)]
    pub spec: HistogramSpec,

    #[serde(default)]
    pub latency: LatencyModel,
}

impl HistogramAggregator {
    pub fn new(spec: HistogramSpec, latency: LatencyModel) -> Self {
        Self { spec, latency }
    }

    /// Samples for one tick of one target.
    pub fn aggregate<R: Rng + ?Sized>(
        &self,
        base: &str,
        labels: &LabelSet,
        multiplier: f64,
        timestamp_ms: i64,
        rng: &mut R,
    ) -> HistogramResult<Vec<Sample>> {
        let draws = self.latency.sample(multiplier, rng)?;
        Ok(HistogramSnapshot::observe(&self.spec, &draws).to_samples(base, labels, timestamp_ms))
    }
}
