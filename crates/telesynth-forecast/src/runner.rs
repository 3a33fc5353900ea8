//! The retrain-and-republish loop.
//!
//! Each cycle queries the lookback window, fits a fresh model on the blocking
//! pool, selects the points to republish and pushes them in chunks to every
//! publisher. No cycle failure stops the loop; only the shutdown signal does.

use std::sync::Arc;
use telesynth_remote::{Publisher, RangeQuery};
use telesynth_types::{
    Clock, ForecastPoint, ForecastWindow, LabelSet, ModelFitError, ModelResult, SeriesPoint,
    Shutdown, Timer,
};
use tracing::{debug, error, info, warn};

use crate::config::ForecastConfig;
use crate::cycle::{
    forecast_samples, publish_chunks, select_points, CycleOutcome, CycleReport, CycleStage,
};
use crate::error::ForecastResult;
use crate::model::Forecaster;

/// Periodic forecast loop over injected collaborators.
pub struct ForecastLoop {
    config: ForecastConfig,
    query: Arc<dyn RangeQuery>,
    forecaster: Arc<dyn Forecaster>,
    publishers: Vec<Arc<dyn Publisher>>,
    clock: Arc<dyn Clock>,
    timer: Arc<dyn Timer>,
    labels: LabelSet,
    metric: String,
}

impl ForecastLoop {
    pub fn new(
        config: ForecastConfig,
        query: Arc<dyn RangeQuery>,
        forecaster: Arc<dyn Forecaster>,
        publishers: Vec<Arc<dyn Publisher>>,
        clock: Arc<dyn Clock>,
        timer: Arc<dyn Timer>,
    ) -> ForecastResult<Self> {
        config.validate()?;
        let labels = LabelSet::new().with("job", config.job.clone());
        let metric = config.forecast_metric();
        Ok(Self {
            config,
            query,
            forecaster,
            publishers,
            clock,
            timer,
            labels,
            metric,
        })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Run cycles until `shutdown` fires. Returns the number of cycles run.
    ///
    /// The first cycle starts immediately; later ones follow the poll
    /// interval. A cycle in flight is finished before stopping.
    pub async fn run(&self, mut shutdown: Shutdown) -> u64 {
        info!(
            query = %self.config.query,
            metric = %self.metric,
            model = self.forecaster.name(),
            publishers = self.publishers.len(),
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "Starting forecast loop"
        );

        let mut cycles = 0u64;
        loop {
            if shutdown.is_triggered() {
                break;
            }

            self.run_cycle().await;
            cycles += 1;

            tokio::select! {
                _ = self.timer.sleep(self.config.poll_interval) => {}
                _ = shutdown.wait() => break,
            }
        }

        info!(cycles, "Forecast loop stopped");
        cycles
    }

    /// Run one query, train, publish cycle.
    pub async fn run_cycle(&self) -> CycleReport {
        let started_ms = self.clock.now_ms();
        let window = ForecastWindow::ending_at(started_ms, self.config.lookback, self.config.step);
        let outcome = self.cycle_outcome(started_ms, &window).await;

        match &outcome {
            CycleOutcome::Published(summary) if summary.failures.is_empty() => info!(
                cycle = started_ms,
                points = summary.points,
                chunks = summary.chunks,
                "Published forecast"
            ),
            CycleOutcome::Published(summary) => warn!(
                cycle = started_ms,
                points = summary.points,
                chunks = summary.chunks,
                failed_pushes = summary.failures.len(),
                "Published forecast with failures"
            ),
            _ => {}
        }

        CycleReport {
            started_ms,
            window,
            outcome,
        }
    }

    async fn cycle_outcome(&self, started_ms: i64, window: &ForecastWindow) -> CycleOutcome {
        debug!(
            stage = %CycleStage::Querying,
            cycle = started_ms,
            query = %self.config.query,
            start = window.start,
            end = window.end,
            "Querying history"
        );
        let history = match self.query.query(&self.config.query, window).await {
            Ok(history) => history,
            Err(e) => {
                error!(
                    stage = %CycleStage::Querying,
                    cycle = started_ms,
                    endpoint = e.endpoint(),
                    error = %e,
                    "Range query failed"
                );
                return CycleOutcome::QueryFailed(e);
            }
        };

        let history_end_ms = match history.last() {
            Some(point) => point.timestamp_ms,
            None => {
                warn!(
                    stage = %CycleStage::Querying,
                    cycle = started_ms,
                    query = %self.config.query,
                    "No data returned; skipping cycle"
                );
                return CycleOutcome::EmptySeries;
            }
        };

        debug!(
            stage = %CycleStage::Training,
            cycle = started_ms,
            points = history.len(),
            model = self.forecaster.name(),
            "Fitting model"
        );
        let predicted = match self.train(history).await {
            Ok(predicted) => predicted,
            Err(e) => {
                error!(
                    stage = %CycleStage::Training,
                    cycle = started_ms,
                    error = %e,
                    "Model training failed"
                );
                return CycleOutcome::ModelFailed(e);
            }
        };

        let selected = select_points(&predicted, history_end_ms, self.config.publish_mode);
        if selected.is_empty() {
            warn!(
                stage = %CycleStage::Selecting,
                cycle = started_ms,
                predicted = predicted.len(),
                mode = %self.config.publish_mode,
                "No forecast points selected"
            );
            return CycleOutcome::NothingSelected {
                predicted: predicted.len(),
            };
        }

        let samples = forecast_samples(&selected, &self.metric, &self.labels);
        debug!(
            stage = %CycleStage::Publishing,
            cycle = started_ms,
            samples = samples.len(),
            chunk_size = self.config.chunk_size,
            "Publishing forecast"
        );
        CycleOutcome::Published(
            publish_chunks(&self.publishers, &samples, self.config.chunk_size, started_ms).await,
        )
    }

    async fn train(&self, history: Vec<SeriesPoint>) -> ModelResult<Vec<ForecastPoint>> {
        let forecaster = Arc::clone(&self.forecaster);
        let horizon = self.config.predict_period;

        tokio::task::spawn_blocking(move || forecaster.fit(&history)?.predict(horizon))
            .await
            .unwrap_or_else(|e| Err(ModelFitError::Aborted(e.to_string())))
    }
}
