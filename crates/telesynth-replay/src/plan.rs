//! What a replay emits each tick.
//!
//! A [`ReplayPlan`] lists the series to generate and the label fan-out of
//! each. [`ReplayPlan::standard`] is the catalogue used against a fresh
//! backend: one metric per pattern, several instances per job, a latency
//! histogram per instance, monotonic counters and a liveness counter with
//! scrape gaps.

use serde::{Deserialize, Serialize};
use telesynth_signal::{
    Bursts, Exponential, GaussianNoise, HistogramAggregator, MissingScrapeMask, MultiFrequency,
    PatternKind, QuadraticRamp, Sawtooth, Sinusoid, Spikes, StepLevels,
};
use telesynth_types::LabelSet;

use crate::error::{ReplayError, ReplayResult};

/// One labelled output of a pattern series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesTarget {
    pub labels: LabelSet,

    /// Factor applied to the pattern value
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl SeriesTarget {
    pub fn new(labels: LabelSet) -> Self {
        Self { labels, scale: 1.0 }
    }

    pub fn scaled(labels: LabelSet, scale: f64) -> Self {
        Self { labels, scale }
    }
}

/// A metric driven by one pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSeries {
    pub metric: String,
    pub pattern: PatternKind,
    pub targets: Vec<SeriesTarget>,
}

/// One labelled output of a latency histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyTarget {
    pub labels: LabelSet,

    /// Multiplier on the latency rate; larger is faster
    pub multiplier: f64,
}

/// A latency histogram family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSeries {
    /// Base name; `_bucket`, `_sum` and `_count` are appended
    pub base: String,

    #[serde(default)]
    pub aggregator: HistogramAggregator,

    pub targets: Vec<LatencyTarget>,
}

/// A counter incremented once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterSeries {
    pub metric: String,
    pub targets: Vec<LabelSet>,
}

/// Counter whose sample is dropped while the mask reports a scrape gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivenessSeries {
    pub metric: String,
    pub labels: LabelSet,

    #[serde(default)]
    pub mask: MissingScrapeMask,
}

/// Everything one replay emits per tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayPlan {
    #[serde(default)]
    pub series: Vec<PatternSeries>,

    #[serde(default)]
    pub histograms: Vec<HistogramSeries>,

    #[serde(default)]
    pub counters: Vec<CounterSeries>,

    #[serde(default)]
    pub liveness: Option<LivenessSeries>,
}

impl ReplayPlan {
    /// The standard catalogue for `job`.
    pub fn standard(job: &str) -> Self {
        let job_labels = LabelSet::new().with("job", job);
        let node = |n: u32| job_labels.clone().with("instance", format!("node-{:02}", n));
        let pair = || vec![SeriesTarget::new(node(1)), SeriesTarget::new(node(2))];

        let sinusoidal_targets = [1.0, 0.7, 0.5, 0.3, 0.1]
            .iter()
            .enumerate()
            .map(|(i, &scale)| SeriesTarget::scaled(node(i as u32 + 1), scale))
            .collect();

        let latency_targets = [1.0, 1.2, 1.5, 2.0]
            .iter()
            .enumerate()
            .map(|(i, &multiplier)| LatencyTarget {
                labels: node(i as u32 + 1),
                multiplier,
            })
            .collect();

        let pattern = |metric: &str, pattern: PatternKind, targets: Vec<SeriesTarget>| {
            PatternSeries {
                metric: metric.to_string(),
                pattern,
                targets,
            }
        };

        Self {
            series: vec![
                pattern(
                    "sinusoidal_metric",
                    PatternKind::Sinusoidal(Sinusoid::default()),
                    sinusoidal_targets,
                ),
                pattern("spiky_metric", PatternKind::Spiky(Spikes::default()), pair()),
                pattern(
                    "slowly_increasing_metric",
                    PatternKind::SlowlyIncreasing(QuadraticRamp::default()),
                    pair(),
                ),
                pattern(
                    "periodic_reset_metric",
                    PatternKind::PeriodicDrop(Sawtooth::default()),
                    pair(),
                ),
                pattern(
                    "noisy_baseline_metric",
                    PatternKind::NoisyBaseline(GaussianNoise::default()),
                    pair(),
                ),
                pattern(
                    "exponential_growth_metric",
                    PatternKind::ExponentialGrowth(Exponential::growth()),
                    pair(),
                ),
                pattern(
                    "gradual_decay_metric",
                    PatternKind::GradualDecay(Exponential::decay()),
                    pair(),
                ),
                pattern(
                    "step_changes_metric",
                    PatternKind::StepChanges(StepLevels::default()),
                    pair(),
                ),
                pattern(
                    "bursty_traffic_metric",
                    PatternKind::BurstyTraffic(Bursts::default()),
                    pair(),
                ),
                pattern(
                    "multi_frequency_metric",
                    PatternKind::MultiFrequency(MultiFrequency::default()),
                    pair(),
                ),
            ],
            histograms: vec![HistogramSeries {
                base: "http_request_duration_seconds".to_string(),
                aggregator: HistogramAggregator::default(),
                targets: latency_targets,
            }],
            counters: vec![CounterSeries {
                metric: "increasing_counter_metric".to_string(),
                targets: vec![node(1), node(2)],
            }],
            liveness: Some(LivenessSeries {
                metric: "missing_scrape_counter_metric".to_string(),
                labels: job_labels.clone(),
                mask: MissingScrapeMask::default(),
            }),
        }
    }

    /// Samples emitted by one tick, ignoring scrape gaps.
    pub fn samples_per_tick(&self) -> usize {
        let patterns: usize = self.series.iter().map(|s| s.targets.len()).sum();
        let histograms: usize = self
            .histograms
            .iter()
            .map(|h| h.targets.len() * (h.aggregator.spec.bounds().len() + 3))
            .sum();
        let counters: usize = self.counters.iter().map(|c| c.targets.len()).sum();
        patterns + histograms + counters + usize::from(self.liveness.is_some())
    }

    /// Reject plans that would fail mid-run.
    pub fn validate(&self) -> ReplayResult<()> {
        for histogram in &self.histograms {
            for target in &histogram.targets {
                let rate = histogram.aggregator.latency.base_rate * target.multiplier;
                if !(rate.is_finite() && rate > 0.0) {
                    return Err(ReplayError::InvalidPlan(format!(
                        "histogram {} target {} has non-positive latency rate {}",
                        histogram.base, target.labels, rate
                    )));
                }
            }
        }

        for series in &self.series {
            if series.metric.is_empty() {
                return Err(ReplayError::InvalidPlan(
                    "pattern series with empty metric name".to_string(),
                ));
            }
        }

        Ok(())
    }
}
