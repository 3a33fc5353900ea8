//! Error taxonomy shared across crates.
//!
//! None of these errors is fatal to a running loop; each is recovered at the
//! stage that produced it and logged with enough context to diagnose.

use thiserror::Error;

/// Network or HTTP failure talking to a backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Request could not be sent or no response arrived.
    #[error("request to {endpoint} failed: {reason}")]
    Request { endpoint: String, reason: String },

    /// Backend answered with a non-success status.
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Response body could not be decoded.
    #[error("could not decode response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    /// Backend reported an error in an otherwise well-formed response.
    #[error("backend error from {endpoint}: {reason}")]
    Backend { endpoint: String, reason: String },
}

impl TransportError {
    pub fn endpoint(&self) -> &str {
        match self {
            TransportError::Request { endpoint, .. }
            | TransportError::Status { endpoint, .. }
            | TransportError::Decode { endpoint, .. }
            | TransportError::Backend { endpoint, .. } => endpoint,
        }
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Model could not be fitted or asked to predict.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelFitError {
    /// Too few points to fit.
    #[error("insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Data or design matrix is degenerate.
    #[error("degenerate input: {0}")]
    Degenerate(String),

    /// Fitting task was cancelled or panicked.
    #[error("model task aborted: {0}")]
    Aborted(String),
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelFitError>;

/// A single chunk failed to reach a single destination.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cycle {cycle_ms}: chunk {chunk} of {total_chunks} to {destination} failed: {source}")]
pub struct ChunkPublishError {
    /// Start of the owning cycle, epoch milliseconds
    pub cycle_ms: i64,

    /// Zero-based chunk index
    pub chunk: usize,

    pub total_chunks: usize,

    pub destination: String,

    #[source]
    pub source: TransportError,
}
