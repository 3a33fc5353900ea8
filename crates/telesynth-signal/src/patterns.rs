//! Waveform pattern library.
//!
//! Every pattern is a pure function of wall time `t` (seconds) or of the
//! replay index `i`. The index counts down towards zero over a replay
//! horizon, so countdown patterns are written in terms of `horizon - i`, the
//! number of ticks already elapsed. Randomized patterns take the random
//! source as an argument so sequences are reproducible under a fixed seed.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Horizon of the standard one-hour replay at one-second steps.
pub const DEFAULT_HORIZON: i64 = 3600;

/// Seconds in a day.
const DAY_SECS: f64 = 86_400.0;

/// `A + A*sin(2*pi*f*t + phase)`; oscillates between 0 and 2A.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sinusoid {
    pub amplitude: f64,
    pub frequency: f64,
    pub phase: f64,
}

impl Default for Sinusoid {
    fn default() -> Self {
        Self {
            amplitude: 50.0,
            frequency: 0.003,
            phase: 0.0,
        }
    }
}

impl Sinusoid {
    pub fn at(&self, t: f64) -> f64 {
        self.amplitude + self.amplitude * (2.0 * PI * self.frequency * t + self.phase).sin()
    }
}

/// Daily cycle plus a short cycle over a baseline, traffic-like.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiFrequency {
    pub baseline: f64,
    pub daily_amplitude: f64,
    pub short_amplitude: f64,
    /// Period of the short cycle in seconds
    pub short_period: f64,
}

impl Default for MultiFrequency {
    fn default() -> Self {
        Self {
            baseline: 70.0,
            daily_amplitude: 30.0,
            short_amplitude: 10.0,
            short_period: 300.0,
        }
    }
}

impl MultiFrequency {
    pub fn at(&self, t: f64) -> f64 {
        self.baseline
            + self.daily_amplitude * (2.0 * PI * t / DAY_SECS).sin()
            + self.short_amplitude * (2.0 * PI * t / self.short_period).sin()
    }
}

/// Quadratic buildup, e.g. a memory leak: `base + rate*(horizon - i)^2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadraticRamp {
    pub base: f64,
    pub rate: f64,
}

impl Default for QuadraticRamp {
    fn default() -> Self {
        Self {
            base: 50.0,
            rate: 0.0003,
        }
    }
}

impl QuadraticRamp {
    pub fn at(&self, i: i64, horizon: i64) -> f64 {
        let elapsed = (horizon - i) as f64;
        self.base + self.rate * elapsed * elapsed
    }
}

/// Ramp that resets every `period` ticks, e.g. GC or cache flushes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sawtooth {
    pub period: i64,
    pub slope: f64,
}

impl Default for Sawtooth {
    fn default() -> Self {
        Self {
            period: 600,
            slope: 0.5,
        }
    }
}

impl Sawtooth {
    pub fn at(&self, i: i64) -> f64 {
        if self.period <= 0 {
            return 0.0;
        }
        i.rem_euclid(self.period) as f64 * self.slope
    }
}

/// `scale * e^(rate*(horizon - i))`; negative rate decays.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Exponential {
    pub scale: f64,
    pub rate: f64,
}

impl Exponential {
    pub fn growth() -> Self {
        Self {
            scale: 10.0,
            rate: 0.0005,
        }
    }

    pub fn decay() -> Self {
        Self {
            scale: 100.0,
            rate: -0.0003,
        }
    }

    pub fn at(&self, i: i64, horizon: i64) -> f64 {
        self.scale * (self.rate * (horizon - i) as f64).exp()
    }
}

/// Piecewise-constant levels.
///
/// `thresholds[k]` is the first index at which `levels[k + 1]` applies, so
/// the value changes exactly at each threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepLevels {
    pub thresholds: Vec<i64>,
    pub levels: Vec<f64>,
}

impl Default for StepLevels {
    fn default() -> Self {
        Self {
            thresholds: vec![600, 1800],
            levels: vec![100.0, 200.0, 300.0],
        }
    }
}

impl StepLevels {
    pub fn at(&self, i: i64) -> f64 {
        let step = self.thresholds.iter().take_while(|&&th| i >= th).count();
        self.levels
            .get(step)
            .or_else(|| self.levels.last())
            .copied()
            .unwrap_or(0.0)
    }
}

/// Short high-load bursts at the start of each window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bursts {
    pub period: i64,
    pub width: i64,
    pub high: f64,
    pub low: f64,
}

impl Default for Bursts {
    fn default() -> Self {
        Self {
            period: 120,
            width: 10,
            high: 200.0,
            low: 50.0,
        }
    }
}

impl Bursts {
    pub fn at(&self, i: i64) -> f64 {
        if self.period > 0 && i.rem_euclid(self.period) < self.width {
            self.high
        } else {
            self.low
        }
    }
}

/// Jittery baseline with rare tall spikes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spikes {
    pub base: f64,
    /// Probability of a spike per draw
    pub probability: f64,
    pub height: f64,
    /// Half-width of the uniform jitter
    pub jitter: f64,
}

impl Default for Spikes {
    fn default() -> Self {
        Self {
            base: 30.0,
            probability: 0.02,
            height: 200.0,
            jitter: 5.0,
        }
    }
}

impl Spikes {
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if rng.gen::<f64>() < self.probability {
            self.base + self.height * rng.gen::<f64>()
        } else {
            self.base + (rng.gen::<f64>() * 2.0 - 1.0) * self.jitter
        }
    }
}

/// Baseline with Gaussian noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianNoise {
    pub base: f64,
    pub sigma: f64,
}

impl Default for GaussianNoise {
    fn default() -> Self {
        Self {
            base: 100.0,
            sigma: 5.0,
        }
    }
}

impl GaussianNoise {
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        // Normal::new accepts a negative sigma, so reject it here.
        if !(self.sigma.is_finite() && self.sigma >= 0.0) {
            return self.base;
        }
        match Normal::new(0.0, self.sigma) {
            Ok(normal) => self.base + normal.sample(rng),
            Err(_) => self.base,
        }
    }
}

pub fn sinusoidal(t: f64) -> f64 {
    Sinusoid::default().at(t)
}

pub fn multi_frequency(t: f64) -> f64 {
    MultiFrequency::default().at(t)
}

pub fn slowly_increasing(i: i64, horizon: i64) -> f64 {
    QuadraticRamp::default().at(i, horizon)
}

pub fn periodic_drop(i: i64) -> f64 {
    Sawtooth::default().at(i)
}

pub fn exponential_growth(i: i64, horizon: i64) -> f64 {
    Exponential::growth().at(i, horizon)
}

pub fn gradual_decay(i: i64, horizon: i64) -> f64 {
    Exponential::decay().at(i, horizon)
}

pub fn step_changes(i: i64) -> f64 {
    StepLevels::default().at(i)
}

pub fn bursty_traffic(i: i64) -> f64 {
    Bursts::default().at(i)
}

pub fn spiky<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    Spikes::default().draw(rng)
}

pub fn noisy_baseline<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    GaussianNoise::default().draw(rng)
}

/// Position of one replay tick, as seen by a pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternInput {
    /// Wall time in seconds
    pub t: f64,

    /// Replay index, counting down towards zero
    pub index: i64,

    pub horizon: i64,
}

/// A pattern named in data, with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternKind {
    Sinusoidal(Sinusoid),
    MultiFrequency(MultiFrequency),
    SlowlyIncreasing(QuadraticRamp),
    PeriodicDrop(Sawtooth),
    ExponentialGrowth(Exponential),
    GradualDecay(Exponential),
    StepChanges(StepLevels),
    BurstyTraffic(Bursts),
    Spiky(Spikes),
    NoisyBaseline(GaussianNoise),
}

impl PatternKind {
    /// Evaluate at one tick. Only randomized variants touch `rng`.
    pub fn evaluate<R: Rng + ?Sized>(&self, input: &PatternInput, rng: &mut R) -> f64 {
        match self {
            PatternKind::Sinusoidal(p) => p.at(input.t),
            PatternKind::MultiFrequency(p) => p.at(input.t),
            PatternKind::SlowlyIncreasing(p) => p.at(input.index, input.horizon),
            PatternKind::PeriodicDrop(p) => p.at(input.index),
            PatternKind::ExponentialGrowth(p) | PatternKind::GradualDecay(p) => {
                p.at(input.index, input.horizon)
            }
            PatternKind::StepChanges(p) => p.at(input.index),
            PatternKind::BurstyTraffic(p) => p.at(input.index),
            PatternKind::Spiky(p) => p.draw(rng),
            PatternKind::NoisyBaseline(p) => p.draw(rng),
        }
    }

    pub fn is_randomized(&self) -> bool {
        matches!(self, PatternKind::Spiky(_) | PatternKind::NoisyBaseline(_))
    }
}
