//! Sample publishers.
//!
//! A [`Publisher`] is one destination backend. Loops hold a list of them and
//! fan each batch out with [`push_to_all`]; every destination's result is
//! reported separately so one failing backend never blocks the others.

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use telesynth_types::{Sample, TransportError, TransportResult, WireSeries};
use tracing::{debug, info};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ERROR_BODY: usize = 512;

/// A destination that accepts sample batches.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Destination identifier used in logs and reports.
    fn name(&self) -> &str;

    /// Push one batch. The batch is delivered as a whole or not at all.
    async fn push(&self, batch: &[Sample]) -> TransportResult<()>;
}

/// Outcome of pushing one batch to one destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub destination: String,
    pub result: TransportResult<()>,
}

impl Delivery {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Push `batch` to every publisher concurrently.
///
/// Returns one [`Delivery`] per publisher, in publisher order.
pub async fn push_to_all(publishers: &[Arc<dyn Publisher>], batch: &[Sample]) -> Vec<Delivery> {
    join_all(publishers.iter().map(|publisher| async move {
        Delivery {
            destination: publisher.name().to_string(),
            result: publisher.push(batch).await,
        }
    }))
    .await
}

/// Encode a batch as JSON lines, one grouped series per line.
pub fn encode_json_lines(batch: &[Sample]) -> Result<String, serde_json::Error> {
    let mut body = String::new();
    for series in WireSeries::group(batch) {
        body.push_str(&serde_json::to_string(&series)?);
        body.push('\n');
    }
    Ok(body)
}

/// Publisher posting JSON lines to an import endpoint.
pub struct HttpPublisher {
    client: Client,
    endpoint: String,
}

impl HttpPublisher {
    pub fn new(endpoint: impl Into<String>) -> TransportResult<Self> {
        let endpoint = endpoint.into();
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Request {
                endpoint: endpoint.clone(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client, endpoint })
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    fn name(&self) -> &str {
        &self.endpoint
    }

    async fn push(&self, batch: &[Sample]) -> TransportResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let body = encode_json_lines(batch).map_err(|e| TransportError::Decode {
            endpoint: self.endpoint.clone(),
            reason: format!("failed to encode batch: {}", e),
        })?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::Request {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            truncate_on_char_boundary(&mut body, MAX_ERROR_BODY);
            return Err(TransportError::Status {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                body,
            });
        }

        debug!(
            destination = %self.endpoint,
            samples = batch.len(),
            "Pushed batch"
        );
        Ok(())
    }
}

fn truncate_on_char_boundary(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
}

/// Dry-run publisher that logs batches instead of sending them.
#[derive(Debug, Clone)]
pub struct LogPublisher {
    name: String,
}

impl LogPublisher {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LogPublisher {
    fn default() -> Self {
        Self::new("dry-run")
    }
}

#[async_trait]
impl Publisher for LogPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn push(&self, batch: &[Sample]) -> TransportResult<()> {
        let series = WireSeries::group(batch);
        info!(
            destination = %self.name,
            samples = batch.len(),
            series = series.len(),
            first_timestamp_ms = batch.first().map(|s| s.timestamp_ms),
            "Dry-run publish"
        );
        for line in &series {
            debug!(destination = %self.name, series = ?line, "Dry-run series");
        }
        Ok(())
    }
}

/// In-memory publisher that records every accepted batch.
///
/// Selected push attempts (zero-based) can be made to fail, which lets
/// callers exercise failure isolation.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    name: String,
    batches: Mutex<Vec<Vec<Sample>>>,
    attempts: AtomicUsize,
    fail_on: HashSet<usize>,
}

impl RecordingPublisher {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Fail the given push attempts.
    pub fn failing_on(mut self, attempts: impl IntoIterator<Item = usize>) -> Self {
        self.fail_on = attempts.into_iter().collect();
        self
    }

    /// Accepted batches, in arrival order.
    pub fn batches(&self) -> Vec<Vec<Sample>> {
        self.batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// All accepted samples, flattened.
    pub fn samples(&self) -> Vec<Sample> {
        self.batches().into_iter().flatten().collect()
    }

    /// Push attempts, accepted or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn push(&self, batch: &[Sample]) -> TransportResult<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.contains(&attempt) {
            return Err(TransportError::Request {
                endpoint: self.name.clone(),
                reason: format!("injected failure on attempt {}", attempt),
            });
        }

        self.batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(batch.to_vec());
        Ok(())
    }
}
