//! Samples, label sets and the wire shape pushed to backends.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reserved label carrying the metric name on the wire.
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Label set attached to a sample.
///
/// Backed by an ordered map so equality and hashing depend only on content,
/// never on the order labels were inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a label, replacing any previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for LabelSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl std::fmt::Display for LabelSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}=\"{}\"", k, v)?;
        }
        write!(f, "}}")
    }
}

/// One data point of one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Metric name
    pub name: String,

    /// Labels, excluding the metric name
    pub labels: LabelSet,

    /// Sample value
    pub value: f64,

    /// Epoch milliseconds
    pub timestamp_ms: i64,
}

impl Sample {
    pub fn new(name: impl Into<String>, labels: LabelSet, value: f64, timestamp_ms: i64) -> Self {
        Self {
            name: name.into(),
            labels,
            value,
            timestamp_ms,
        }
    }

    /// Identity of the series this sample belongs to.
    pub fn series_key(&self) -> (&str, &LabelSet) {
        (&self.name, &self.labels)
    }
}

/// Series as it appears on the wire.
///
/// `{"metric": {"__name__": ..., <label>: <value>}, "values": [...], "timestamps": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSeries {
    pub metric: BTreeMap<String, String>,
    pub values: Vec<f64>,
    pub timestamps: Vec<i64>,
}

impl WireSeries {
    /// Wire form of a single sample.
    pub fn from_sample(sample: &Sample) -> Self {
        let mut metric: BTreeMap<String, String> = sample
            .labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        metric.insert(METRIC_NAME_LABEL.to_string(), sample.name.clone());

        Self {
            metric,
            values: vec![sample.value],
            timestamps: vec![sample.timestamp_ms],
        }
    }

    /// Group a batch into one wire series per distinct (name, labels).
    ///
    /// Series keep the order in which they first appear in the batch, and
    /// each series keeps its samples in batch order.
    pub fn group(samples: &[Sample]) -> Vec<WireSeries> {
        let mut index: BTreeMap<(&str, &LabelSet), usize> = BTreeMap::new();
        let mut out: Vec<WireSeries> = Vec::new();

        for sample in samples {
            match index.get(&sample.series_key()) {
                Some(&pos) => {
                    out[pos].values.push(sample.value);
                    out[pos].timestamps.push(sample.timestamp_ms);
                }
                None => {
                    index.insert(sample.series_key(), out.len());
                    out.push(WireSeries::from_sample(sample));
                }
            }
        }

        out
    }

    pub fn name(&self) -> Option<&str> {
        self.metric.get(METRIC_NAME_LABEL).map(String::as_str)
    }
}
