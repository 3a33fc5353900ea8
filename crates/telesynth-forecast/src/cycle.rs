//! One forecast cycle: selection, sample building and chunked publishing.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use telesynth_remote::{push_to_all, Publisher};
use telesynth_types::{
    ChunkPublishError, ForecastPoint, ForecastWindow, LabelSet, ModelFitError, PublishMode, Sample,
    TransportError,
};
use tracing::warn;

/// Stage a cycle is in, used as a log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStage {
    Querying,
    Training,
    Selecting,
    Publishing,
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleStage::Querying => "querying",
            CycleStage::Training => "training",
            CycleStage::Selecting => "selecting",
            CycleStage::Publishing => "publishing",
        };
        f.write_str(name)
    }
}

/// What happened during the publish stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishSummary {
    /// Forecast points selected for publishing
    pub points: usize,

    pub chunks: usize,

    /// Successful (chunk, destination) pushes
    pub delivered: usize,

    pub failures: Vec<ChunkPublishError>,
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The range query failed; nothing was trained
    QueryFailed(TransportError),

    /// The query matched no data; nothing was trained
    EmptySeries,

    /// Fitting or prediction failed; nothing was published
    ModelFailed(ModelFitError),

    /// The model produced no point to publish
    NothingSelected { predicted: usize },

    Published(PublishSummary),
}

impl CycleOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, CycleOutcome::Published(_))
    }

    /// Failed (chunk, destination) pushes of a published cycle.
    pub fn publish_failures(&self) -> &[ChunkPublishError] {
        match self {
            CycleOutcome::Published(summary) => &summary.failures,
            _ => &[],
        }
    }
}

/// Report of a single cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub started_ms: i64,
    pub window: ForecastWindow,
    pub outcome: CycleOutcome,
}

/// Pick the points to publish out of a model's output.
///
/// `last_point` keeps the final point; `full_tail` keeps every point after
/// `history_end_ms`.
pub fn select_points(
    points: &[ForecastPoint],
    history_end_ms: i64,
    mode: PublishMode,
) -> Vec<ForecastPoint> {
    match mode {
        PublishMode::LastPoint => points.last().copied().into_iter().collect(),
        PublishMode::FullTail => points
            .iter()
            .filter(|p| p.timestamp_ms > history_end_ms)
            .copied()
            .collect(),
    }
}

/// One sample per forecast point.
pub fn forecast_samples(points: &[ForecastPoint], metric: &str, labels: &LabelSet) -> Vec<Sample> {
    points
        .iter()
        .map(|p| Sample::new(metric, labels.clone(), p.yhat, p.timestamp_ms))
        .collect()
}

/// Publish `samples` in chunks of `chunk_size`, each chunk to every
/// publisher. `cycle_ms` tags the logs and failures of this cycle.
///
/// Every (chunk, destination) push is independent: failures are collected
/// and the remaining pushes still run.
pub async fn publish_chunks(
    publishers: &[Arc<dyn Publisher>],
    samples: &[Sample],
    chunk_size: usize,
    cycle_ms: i64,
) -> PublishSummary {
    let chunk_size = chunk_size.max(1);
    let total_chunks = samples.len().div_ceil(chunk_size);
    let mut summary = PublishSummary {
        points: samples.len(),
        chunks: total_chunks,
        ..Default::default()
    };

    for (chunk, batch) in samples.chunks(chunk_size).enumerate() {
        for delivery in push_to_all(publishers, batch).await {
            match delivery.result {
                Ok(()) => summary.delivered += 1,
                Err(source) => {
                    warn!(
                        stage = %CycleStage::Publishing,
                        cycle = cycle_ms,
                        destination = %delivery.destination,
                        chunk = chunk + 1,
                        total_chunks,
                        error = %source,
                        "Failed to publish forecast chunk"
                    );
                    summary.failures.push(ChunkPublishError {
                        cycle_ms,
                        chunk,
                        total_chunks,
                        destination: delivery.destination,
                        source,
                    });
                }
            }
        }
    }

    summary
}
