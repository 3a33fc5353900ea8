//! Replay scheduler.
//!
//! Walks a [`ReplayPlan`] one tick at a time and pushes every tick's batch to
//! all publishers. Backfill ticks run back to back over the window ending at
//! the start time; live ticks follow the clock and wait `interval` between
//! them. Cancellation is checked at the top of every tick.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use telesynth_remote::{push_to_all, Publisher};
use telesynth_signal::PatternInput;
use telesynth_types::{Clock, Sample, Shutdown, Timer};
use tracing::{debug, info, warn};

use crate::error::{ReplayError, ReplayResult};
use crate::plan::ReplayPlan;

/// How ticks are laid out in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReplayMode {
    /// `horizon` ticks over the past window, without delay
    #[default]
    Backfill,

    /// One tick per `interval` until shutdown or `max_ticks`
    Live {
        interval: Duration,
        #[serde(default)]
        max_ticks: Option<u64>,
    },
}

/// Replay configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayConfig {
    #[serde(default)]
    pub mode: ReplayMode,

    /// Ticks in a backfill window; starting index of the countdown patterns
    #[serde(default = "default_horizon")]
    pub horizon: u64,

    /// Spacing of backfill ticks
    #[serde(default = "default_step")]
    pub step: Duration,

    /// Seed for the random patterns and latency draws
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_horizon() -> u64 {
    3600
}

fn default_step() -> Duration {
    Duration::from_secs(1)
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            mode: ReplayMode::default(),
            horizon: default_horizon(),
            step: default_step(),
            seed: None,
        }
    }
}

impl ReplayConfig {
    pub fn validate(&self) -> ReplayResult<()> {
        if self.horizon == 0 {
            return Err(ReplayError::InvalidConfig(
                "horizon must be positive".to_string(),
            ));
        }
        if i64::try_from(self.horizon).is_err() {
            return Err(ReplayError::InvalidConfig(format!(
                "horizon {} is too large",
                self.horizon
            )));
        }
        if self.step.as_millis() == 0 || self.step.subsec_nanos() % 1_000_000 != 0 {
            return Err(ReplayError::InvalidConfig(format!(
                "step must be a positive whole number of milliseconds, got {:?}",
                self.step
            )));
        }
        if let ReplayMode::Live { interval, .. } = self.mode {
            if interval.is_zero() {
                return Err(ReplayError::InvalidConfig(
                    "live interval must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn step_ms(&self) -> i64 {
        i64::try_from(self.step.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Position of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// 1-based tick count
    pub number: u64,

    /// Countdown index seen by the patterns
    pub index: i64,

    pub timestamp_ms: i64,

    /// Seconds since the start of the replay window
    pub elapsed_secs: f64,
}

/// Summary of one replay run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    pub ticks: u64,
    pub samples: u64,

    /// (tick, destination) pushes that failed
    pub failed_pushes: u64,

    pub first_timestamp_ms: Option<i64>,
    pub last_timestamp_ms: Option<i64>,

    /// Whether the run stopped on shutdown
    pub cancelled: bool,
}

impl ReplayReport {
    fn record(&mut self, tick: &Tick, samples: usize) {
        self.ticks += 1;
        self.samples += samples as u64;
        self.first_timestamp_ms.get_or_insert(tick.timestamp_ms);
        self.last_timestamp_ms = Some(tick.timestamp_ms);
    }
}

/// Drives a replay plan into a set of publishers.
pub struct ReplayScheduler {
    config: ReplayConfig,
    plan: ReplayPlan,
    publishers: Vec<Arc<dyn Publisher>>,
    clock: Arc<dyn Clock>,
    timer: Arc<dyn Timer>,
}

impl ReplayScheduler {
    pub fn new(
        config: ReplayConfig,
        plan: ReplayPlan,
        publishers: Vec<Arc<dyn Publisher>>,
        clock: Arc<dyn Clock>,
        timer: Arc<dyn Timer>,
    ) -> ReplayResult<Self> {
        config.validate()?;
        plan.validate()?;
        Ok(Self {
            config,
            plan,
            publishers,
            clock,
            timer,
        })
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Run until the window is exhausted, `max_ticks` is reached or
    /// `shutdown` fires.
    pub async fn run(&self, mut shutdown: Shutdown) -> ReplayResult<ReplayReport> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let start_ms = self.clock.now_ms();
        let horizon = i64::try_from(self.config.horizon).unwrap_or(i64::MAX);
        let mut report = ReplayReport::default();

        info!(
            mode = ?self.config.mode,
            horizon = self.config.horizon,
            start = %format_timestamp(start_ms),
            publishers = self.publishers.len(),
            samples_per_tick = self.plan.samples_per_tick(),
            "Starting replay"
        );

        match self.config.mode {
            ReplayMode::Backfill => {
                let step_ms = self.config.step_ms();
                for index in (1..=horizon).rev() {
                    if shutdown.is_triggered() {
                        report.cancelled = true;
                        break;
                    }
                    let tick = Tick {
                        number: (horizon - index + 1) as u64,
                        index,
                        timestamp_ms: start_ms - index * step_ms,
                        elapsed_secs: ((horizon - index) * step_ms) as f64 / 1000.0,
                    };
                    self.emit(&tick, &mut rng, &mut report).await?;
                }
            }
            ReplayMode::Live {
                interval,
                max_ticks,
            } => {
                let mut number = 0u64;
                loop {
                    if shutdown.is_triggered() {
                        report.cancelled = true;
                        break;
                    }
                    if max_ticks.is_some_and(|max| number >= max) {
                        break;
                    }
                    number += 1;
                    let now_ms = self.clock.now_ms();
                    let tick = Tick {
                        number,
                        index: horizon - (number - 1) as i64,
                        timestamp_ms: now_ms,
                        elapsed_secs: (now_ms - start_ms) as f64 / 1000.0,
                    };
                    self.emit(&tick, &mut rng, &mut report).await?;

                    if max_ticks.is_some_and(|max| number >= max) {
                        break;
                    }

                    tokio::select! {
                        _ = self.timer.sleep(interval) => {}
                        _ = shutdown.wait() => {
                            report.cancelled = true;
                            break;
                        }
                    }
                }
            }
        }

        info!(
            ticks = report.ticks,
            samples = report.samples,
            failed_pushes = report.failed_pushes,
            cancelled = report.cancelled,
            "Replay finished"
        );
        Ok(report)
    }

    /// Samples of one tick, in plan order.
    pub fn build_batch<R: Rng + ?Sized>(
        &self,
        tick: &Tick,
        rng: &mut R,
    ) -> ReplayResult<Vec<Sample>> {
        let input = PatternInput {
            t: tick.timestamp_ms as f64 / 1000.0,
            index: tick.index,
            horizon: i64::try_from(self.config.horizon).unwrap_or(i64::MAX),
        };
        let mut batch = Vec::with_capacity(self.plan.samples_per_tick());

        for series in &self.plan.series {
            for target in &series.targets {
                let value = series.pattern.evaluate(&input, rng) * target.scale;
                if !value.is_finite() {
                    // Non-finite values cannot be encoded on the import wire.
                    warn!(
                        metric = %series.metric,
                        labels = %target.labels,
                        tick = tick.number,
                        index = tick.index,
                        value,
                        "Skipping non-finite sample"
                    );
                    continue;
                }
                batch.push(Sample::new(
                    series.metric.clone(),
                    target.labels.clone(),
                    value,
                    tick.timestamp_ms,
                ));
            }
        }

        for histogram in &self.plan.histograms {
            for target in &histogram.targets {
                batch.extend(histogram.aggregator.aggregate(
                    &histogram.base,
                    &target.labels,
                    target.multiplier,
                    tick.timestamp_ms,
                    rng,
                )?);
            }
        }

        for counter in &self.plan.counters {
            for labels in &counter.targets {
                batch.push(Sample::new(
                    counter.metric.clone(),
                    labels.clone(),
                    tick.number as f64,
                    tick.timestamp_ms,
                ));
            }
        }

        if let Some(liveness) = &self.plan.liveness {
            if !liveness.mask.is_missing(tick.elapsed_secs) {
                batch.push(Sample::new(
                    liveness.metric.clone(),
                    liveness.labels.clone(),
                    tick.number as f64,
                    tick.timestamp_ms,
                ));
            }
        }

        Ok(batch)
    }

    async fn emit(
        &self,
        tick: &Tick,
        rng: &mut StdRng,
        report: &mut ReplayReport,
    ) -> ReplayResult<()> {
        let batch = self.build_batch(tick, rng)?;

        for delivery in push_to_all(&self.publishers, &batch).await {
            if let Err(e) = delivery.result {
                report.failed_pushes += 1;
                warn!(
                    destination = %delivery.destination,
                    tick = tick.number,
                    timestamp = %format_timestamp(tick.timestamp_ms),
                    error = %e,
                    "Failed to push replay tick"
                );
            }
        }

        debug!(
            tick = tick.number,
            index = tick.index,
            timestamp = %format_timestamp(tick.timestamp_ms),
            samples = batch.len(),
            "Replayed tick"
        );
        report.record(tick, batch.len());
        Ok(())
    }
}

fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use telesynth_signal::{Exponential, MissingScrapeMask, PatternKind, Sinusoid};
    use telesynth_types::{LabelSet, ManualClock};

    use crate::plan::{LivenessSeries, PatternSeries, SeriesTarget};

    fn scheduler(config: ReplayConfig, plan: ReplayPlan) -> ReplayScheduler {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        ReplayScheduler::new(config, plan, Vec::new(), clock.clone(), clock).unwrap()
    }

    fn tick(number: u64, elapsed_secs: f64) -> Tick {
        Tick {
            number,
            index: 3600 - number as i64 + 1,
            timestamp_ms: 1_700_000_000_000,
            elapsed_secs,
        }
    }

    #[test]
    fn test_default_config() {
        let config = ReplayConfig::default();
        assert_eq!(config.mode, ReplayMode::Backfill);
        assert_eq!(config.horizon, 3600);
        assert_eq!(config.step, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let zero_horizon = ReplayConfig {
            horizon: 0,
            ..Default::default()
        };
        assert!(matches!(
            zero_horizon.validate(),
            Err(ReplayError::InvalidConfig(_))
        ));

        let sub_millisecond = ReplayConfig {
            step: Duration::from_micros(1500),
            ..Default::default()
        };
        assert!(sub_millisecond.validate().is_err());

        let zero_interval = ReplayConfig {
            mode: ReplayMode::Live {
                interval: Duration::ZERO,
                max_ticks: None,
            },
            ..Default::default()
        };
        assert!(zero_interval.validate().is_err());
    }

    #[test]
    fn test_standard_batch_shape() {
        let scheduler = scheduler(
            ReplayConfig {
                seed: Some(7),
                ..Default::default()
            },
            ReplayPlan::standard("example"),
        );
        let mut rng = StdRng::seed_from_u64(7);
        let batch = scheduler.build_batch(&tick(1, 0.0), &mut rng).unwrap();

        assert_eq!(batch.len(), scheduler.plan.samples_per_tick());
        assert!(batch.iter().all(|s| s.timestamp_ms == 1_700_000_000_000));

        let counter: Vec<&Sample> = batch
            .iter()
            .filter(|s| s.name == "increasing_counter_metric")
            .collect();
        assert_eq!(counter.len(), 2);
        assert!(counter.iter().all(|s| s.value == 1.0));

        let buckets = batch
            .iter()
            .filter(|s| s.name == "http_request_duration_seconds_bucket")
            .count();
        assert_eq!(buckets, 4 * 7);
    }

    #[test]
    fn test_target_scale_applies() {
        let plan = ReplayPlan {
            series: vec![PatternSeries {
                metric: "wave".to_string(),
                pattern: PatternKind::Sinusoidal(Sinusoid::default()),
                targets: vec![
                    SeriesTarget::new(LabelSet::new().with("instance", "a")),
                    SeriesTarget::scaled(LabelSet::new().with("instance", "b"), 0.5),
                ],
            }],
            ..Default::default()
        };
        let scheduler = scheduler(ReplayConfig::default(), plan);
        let mut rng = StdRng::seed_from_u64(0);
        let batch = scheduler.build_batch(&tick(1, 0.0), &mut rng).unwrap();

        assert_eq!(batch.len(), 2);
        assert!((batch[1].value - batch[0].value * 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_pattern_values_skipped() {
        let plan = ReplayPlan {
            series: vec![
                PatternSeries {
                    metric: "exponential_growth_metric".to_string(),
                    pattern: PatternKind::ExponentialGrowth(Exponential::growth()),
                    targets: vec![SeriesTarget::new(LabelSet::new().with("instance", "a"))],
                },
                PatternSeries {
                    metric: "wave".to_string(),
                    pattern: PatternKind::Sinusoidal(Sinusoid::default()),
                    targets: vec![SeriesTarget::new(LabelSet::new().with("instance", "a"))],
                },
            ],
            ..Default::default()
        };
        let scheduler = scheduler(ReplayConfig::default(), plan);
        let mut rng = StdRng::seed_from_u64(0);

        // Far into live mode the countdown index makes the growth overflow.
        let late = Tick {
            number: 2_000_000,
            index: 3600 - 2_000_000 + 1,
            timestamp_ms: 1_700_000_000_000,
            elapsed_secs: 1_999_999.0,
        };
        let batch = scheduler.build_batch(&late, &mut rng).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].name, "wave");

        let early = scheduler.build_batch(&tick(1, 0.0), &mut rng).unwrap();
        assert_eq!(early.len(), 2);
        assert!(early.iter().all(|s| s.value.is_finite()));
    }

    #[test]
    fn test_liveness_dropped_inside_gap() {
        let plan = ReplayPlan {
            liveness: Some(LivenessSeries {
                metric: "missing_scrape_counter_metric".to_string(),
                labels: LabelSet::new().with("job", "example"),
                mask: MissingScrapeMask::default(),
            }),
            ..Default::default()
        };
        let scheduler = scheduler(ReplayConfig::default(), plan);
        let mut rng = StdRng::seed_from_u64(0);

        let present = scheduler.build_batch(&tick(121, 120.0), &mut rng).unwrap();
        assert_eq!(present.len(), 1);
        assert_eq!(present[0].value, 121.0);

        let missing = scheduler.build_batch(&tick(122, 121.0), &mut rng).unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn test_mode_serde() {
        let live: ReplayMode = serde_json::from_value(serde_json::json!({
            "mode": "live",
            "interval": {"secs": 1, "nanos": 0}
        }))
        .unwrap();
        assert_eq!(
            live,
            ReplayMode::Live {
                interval: Duration::from_secs(1),
                max_ticks: None
            }
        );

        let backfill: ReplayMode =
            serde_json::from_value(serde_json::json!({"mode": "backfill"})).unwrap();
        assert_eq!(backfill, ReplayMode::Backfill);
    }
}
