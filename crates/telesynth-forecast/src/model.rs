//! Forecasting models.
//!
//! A [`Forecaster`] turns a history into a fitted [`ForecastModel`], which
//! then predicts a number of points past the end of that history. Both are
//! synchronous; the forecast loop runs them on the blocking pool.
//!
//! [`SeasonalTrendForecaster`] is the built-in model: a ridge regression on
//! an intercept, a linear trend and Fourier terms for each seasonality.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use telesynth_types::{ForecastPoint, ModelFitError, ModelResult, SeriesPoint};
use tracing::warn;

/// Fits a model to a history.
pub trait Forecaster: Send + Sync {
    /// Model name used in logs.
    fn name(&self) -> &str;

    fn fit(&self, history: &[SeriesPoint]) -> ModelResult<Box<dyn ForecastModel>>;
}

/// A fitted model.
pub trait ForecastModel: Send {
    /// Predict every timestamp the model was fitted on, then `horizon`
    /// points beyond the last one, spaced by the history's step.
    fn predict(&self, horizon: usize) -> ModelResult<Vec<ForecastPoint>>;
}

/// One periodic component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Seasonality {
    /// Period in seconds
    pub period_secs: f64,

    /// Number of sin/cos pairs
    pub order: usize,
}

impl Seasonality {
    pub fn new(period_secs: f64, order: usize) -> Self {
        Self { period_secs, order }
    }
}

/// Trend plus Fourier seasonality, fitted by ridge least squares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalTrendForecaster {
    #[serde(default = "default_seasonalities")]
    pub seasonalities: Vec<Seasonality>,

    /// Diagonal regularisation added to the normal equations
    #[serde(default = "default_ridge")]
    pub ridge: f64,

    /// Smallest history accepted; never below 2
    #[serde(default = "default_min_points")]
    pub min_points: usize,
}

fn default_seasonalities() -> Vec<Seasonality> {
    vec![Seasonality::new(600.0, 5)]
}

fn default_ridge() -> f64 {
    1e-6
}

fn default_min_points() -> usize {
    2
}

impl Default for SeasonalTrendForecaster {
    fn default() -> Self {
        Self {
            seasonalities: default_seasonalities(),
            ridge: default_ridge(),
            min_points: default_min_points(),
        }
    }
}

impl SeasonalTrendForecaster {
    /// Trend only, no seasonal terms.
    pub fn trend_only() -> Self {
        Self {
            seasonalities: Vec::new(),
            ..Default::default()
        }
    }

    fn width(&self) -> usize {
        2 + self.seasonalities.iter().map(|s| 2 * s.order).sum::<usize>()
    }
}

impl Forecaster for SeasonalTrendForecaster {
    fn name(&self) -> &str {
        "seasonal_trend"
    }

    fn fit(&self, history: &[SeriesPoint]) -> ModelResult<Box<dyn ForecastModel>> {
        let history_len = history.len();
        let history: Vec<SeriesPoint> = history
            .iter()
            .filter(|p| p.value.is_finite())
            .copied()
            .collect();
        let dropped = history_len - history.len();
        if dropped > 0 {
            warn!(dropped, kept = history.len(), "Dropped non-finite points before fitting");
        }

        let required = self.min_points.max(2);
        if history.len() < required {
            return Err(ModelFitError::InsufficientData {
                required,
                actual: history.len(),
            });
        }
        if !(self.ridge.is_finite() && self.ridge >= 0.0) {
            return Err(ModelFitError::Degenerate(format!(
                "invalid ridge {}",
                self.ridge
            )));
        }
        if let Some(s) = self
            .seasonalities
            .iter()
            .find(|s| !(s.period_secs.is_finite() && s.period_secs > 0.0))
        {
            return Err(ModelFitError::Degenerate(format!(
                "invalid seasonality period {}",
                s.period_secs
            )));
        }

        let timestamps: Vec<i64> = history.iter().map(|p| p.timestamp_ms).collect();
        let step_ms = median_step(&timestamps)?;
        let basis = Basis {
            origin_ms: timestamps[0],
            span_ms: (timestamps[timestamps.len() - 1] - timestamps[0]).max(1),
            seasonalities: self.seasonalities.clone(),
        };

        let width = self.width();
        let mut xtx = vec![vec![0.0; width]; width];
        let mut xty = vec![0.0; width];
        let mut row = vec![0.0; width];

        for point in &history {
            basis.fill(point.timestamp_ms, &mut row);
            for ((xtx_row, xty_cell), &xa) in xtx.iter_mut().zip(xty.iter_mut()).zip(&row) {
                *xty_cell += xa * point.value;
                for (cell, &xb) in xtx_row.iter_mut().zip(&row) {
                    *cell += xa * xb;
                }
            }
        }
        for (a, diagonal) in xtx.iter_mut().enumerate() {
            diagonal[a] += self.ridge;
        }

        let coefficients = solve(xtx, xty)?;

        Ok(Box::new(FittedSeasonalTrend {
            basis,
            coefficients,
            timestamps,
            step_ms,
        }))
    }
}

#[derive(Debug, Clone)]
struct Basis {
    origin_ms: i64,
    span_ms: i64,
    seasonalities: Vec<Seasonality>,
}

impl Basis {
    fn fill(&self, timestamp_ms: i64, row: &mut [f64]) {
        let offset_ms = (timestamp_ms - self.origin_ms) as f64;
        let secs = offset_ms / 1000.0;

        row[0] = 1.0;
        row[1] = offset_ms / self.span_ms as f64;

        let mut col = 2;
        for seasonality in &self.seasonalities {
            for k in 1..=seasonality.order {
                let angle = 2.0 * PI * k as f64 * secs / seasonality.period_secs;
                row[col] = angle.sin();
                row[col + 1] = angle.cos();
                col += 2;
            }
        }
    }
}

struct FittedSeasonalTrend {
    basis: Basis,
    coefficients: Vec<f64>,
    timestamps: Vec<i64>,
    step_ms: i64,
}

impl FittedSeasonalTrend {
    fn value_at(&self, timestamp_ms: i64, row: &mut [f64]) -> f64 {
        self.basis.fill(timestamp_ms, row);
        row.iter()
            .zip(&self.coefficients)
            .map(|(x, beta)| x * beta)
            .sum()
    }
}

impl ForecastModel for FittedSeasonalTrend {
    fn predict(&self, horizon: usize) -> ModelResult<Vec<ForecastPoint>> {
        let last_ms = match self.timestamps.last() {
            Some(&last) => last,
            None => return Ok(Vec::new()),
        };
        let mut row = vec![0.0; self.coefficients.len()];
        let mut points = Vec::with_capacity(self.timestamps.len() + horizon);

        for &ts in &self.timestamps {
            points.push(ForecastPoint::new(ts, self.value_at(ts, &mut row)));
        }
        for k in 1..=horizon as i64 {
            let ts = last_ms + k * self.step_ms;
            points.push(ForecastPoint::new(ts, self.value_at(ts, &mut row)));
        }

        Ok(points)
    }
}

fn median_step(timestamps: &[i64]) -> ModelResult<i64> {
    let mut steps: Vec<i64> = timestamps.windows(2).map(|w| w[1] - w[0]).collect();
    if steps.iter().any(|&s| s <= 0) {
        return Err(ModelFitError::Degenerate(
            "timestamps are not strictly increasing".to_string(),
        ));
    }
    steps.sort_unstable();
    steps
        .get(steps.len() / 2)
        .copied()
        .ok_or_else(|| ModelFitError::Degenerate("history has a single point".to_string()))
}

const PIVOT_EPSILON: f64 = 1e-12;

/// Solve `a x = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> ModelResult<Vec<f64>> {
    let n = b.len();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        let magnitude = a[pivot][col].abs();
        if magnitude.is_nan() || magnitude <= PIVOT_EPSILON {
            return Err(ModelFitError::Degenerate(format!(
                "vanishing pivot in column {}",
                col
            )));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }

    if x.iter().all(|v| v.is_finite()) {
        Ok(x)
    } else {
        Err(ModelFitError::Degenerate(
            "solution is not finite".to_string(),
        ))
    }
}
