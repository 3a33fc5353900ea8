//! Range queries against a Prometheus-compatible backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use telesynth_types::{
    format_duration, ForecastWindow, SeriesPoint, TransportError, TransportResult,
};
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const QUERY_RANGE_PATH: &str = "/api/v1/query_range";

/// Historical series source.
#[async_trait]
pub trait RangeQuery: Send + Sync {
    /// Evaluate `expr` over `window`.
    ///
    /// Returns the points of the first matching series in timestamp order,
    /// or an empty vec when nothing matched.
    async fn query(&self, expr: &str, window: &ForecastWindow) -> TransportResult<Vec<SeriesPoint>>;
}

#[derive(Debug, Deserialize)]
struct QueryRangeResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryRangeData>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryRangeData {
    #[serde(default)]
    result: Vec<MatrixSeries>,
}

#[derive(Debug, Deserialize)]
struct MatrixSeries {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    #[serde(default)]
    values: Vec<(f64, String)>,
}

/// `query_range` client.
pub struct HttpRangeQuery {
    client: Client,
    base_url: String,
}

impl HttpRangeQuery {
    pub fn new(base_url: impl Into<String>) -> TransportResult<Self> {
        let base_url = base_url.into();
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Request {
                endpoint: base_url.clone(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client, base_url })
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), QUERY_RANGE_PATH)
    }
}

#[async_trait]
impl RangeQuery for HttpRangeQuery {
    async fn query(&self, expr: &str, window: &ForecastWindow) -> TransportResult<Vec<SeriesPoint>> {
        let endpoint = self.endpoint();
        let params = [
            ("query", expr.to_string()),
            ("start", window.start.to_string()),
            ("end", window.end.to_string()),
            ("step", format_duration(window.step)),
        ];

        let response = self
            .client
            .get(&endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|e| TransportError::Request {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| TransportError::Request {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;

        let parsed: Option<QueryRangeResponse> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            // Prometheus reports query errors as 4xx with an error body.
            if let Some(QueryRangeResponse {
                error: Some(reason),
                ..
            }) = parsed
            {
                return Err(TransportError::Backend { endpoint, reason });
            }
            return Err(TransportError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        let parsed = match parsed {
            Some(parsed) => parsed,
            None => {
                return Err(TransportError::Decode {
                    endpoint,
                    reason: "response is not a query_range document".to_string(),
                })
            }
        };

        if parsed.status != "success" {
            let reason = match (parsed.error_type, parsed.error) {
                (Some(kind), Some(error)) => format!("{}: {}", kind, error),
                (None, Some(error)) => error,
                (Some(kind), None) => kind,
                (None, None) => format!("status {}", parsed.status),
            };
            return Err(TransportError::Backend { endpoint, reason });
        }

        let mut series = parsed.data.map(|data| data.result).unwrap_or_default();
        if series.is_empty() {
            debug!(query = expr, "Range query matched no series");
            return Ok(Vec::new());
        }
        if series.len() > 1 {
            warn!(
                query = expr,
                matched = series.len(),
                "Range query matched several series; using the first"
            );
        }

        let first = series.swap_remove(0);
        debug!(query = expr, metric = ?first.metric, points = first.values.len(), "Range query result");

        first
            .values
            .into_iter()
            .map(|(ts, raw)| {
                let value: f64 = raw.parse().map_err(|_| TransportError::Decode {
                    endpoint: endpoint.clone(),
                    reason: format!("invalid sample value {:?}", raw),
                })?;
                Ok(SeriesPoint::new((ts * 1000.0).round() as i64, value))
            })
            .collect()
    }
}

/// Range query answering from a fixed result, counting calls.
#[derive(Debug, Default)]
pub struct FixedRangeQuery {
    result: Option<TransportResult<Vec<SeriesPoint>>>,
    calls: AtomicUsize,
    windows: Mutex<Vec<ForecastWindow>>,
}

impl FixedRangeQuery {
    pub fn returning(points: Vec<SeriesPoint>) -> Self {
        Self {
            result: Some(Ok(points)),
            ..Default::default()
        }
    }

    pub fn failing(error: TransportError) -> Self {
        Self {
            result: Some(Err(error)),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Windows requested so far.
    pub fn windows(&self) -> Vec<ForecastWindow> {
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl RangeQuery for FixedRangeQuery {
    async fn query(&self, _expr: &str, window: &ForecastWindow) -> TransportResult<Vec<SeriesPoint>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(*window);
        self.result.clone().unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn window() -> ForecastWindow {
        ForecastWindow {
            start: 1_700_000_000,
            end: 1_700_003_600,
            step: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_query_uses_first_series() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/query_range"))
            .and(query_param("query", "http_request_latency"))
            .and(query_param("start", "1700000000"))
            .and(query_param("end", "1700003600"))
            .and(query_param("step", "1s"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {
                    "resultType": "matrix",
                    "result": [
                        {
                            "metric": {"__name__": "http_request_latency", "job": "example"},
                            "values": [[1700000000.0, "0.5"], [1700000001.5, "0.75"]]
                        },
                        {
                            "metric": {"__name__": "http_request_latency", "job": "other"},
                            "values": [[1700000000.0, "99"]]
                        }
                    ]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpRangeQuery::new(format!("{}/", server.uri())).unwrap();
        let points = client.query("http_request_latency", &window()).await.unwrap();

        assert_eq!(
            points,
            vec![
                SeriesPoint::new(1_700_000_000_000, 0.5),
                SeriesPoint::new(1_700_000_001_500, 0.75),
            ]
        );
    }

    #[tokio::test]
    async fn test_query_empty_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {"resultType": "matrix", "result": []}
            })))
            .mount(&server)
            .await;

        let client = HttpRangeQuery::new(server.uri()).unwrap();
        assert!(client.query("missing", &window()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "status": "error",
                "errorType": "bad_data",
                "error": "parse error at char 5"
            })))
            .mount(&server)
            .await;

        let client = HttpRangeQuery::new(server.uri()).unwrap();
        let err = client.query("rate(", &window()).await.unwrap_err();
        assert!(matches!(err, TransportError::Backend { ref reason, .. } if reason.contains("parse error")));
    }

    #[tokio::test]
    async fn test_query_error_status_in_success_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "error",
                "errorType": "timeout",
            })))
            .mount(&server)
            .await;

        let client = HttpRangeQuery::new(server.uri()).unwrap();
        let err = client.query("up", &window()).await.unwrap_err();
        assert!(matches!(err, TransportError::Backend { ref reason, .. } if reason == "timeout"));
    }

    #[tokio::test]
    async fn test_query_plain_http_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let client = HttpRangeQuery::new(server.uri()).unwrap();
        let err = client.query("up", &window()).await.unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_query_bad_value_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {"result": [{"metric": {}, "values": [[1.0, "abc"]]}]}
            })))
            .mount(&server)
            .await;

        let client = HttpRangeQuery::new(server.uri()).unwrap();
        let err = client.query("up", &window()).await.unwrap_err();
        assert!(matches!(err, TransportError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_fixed_range_query_records_calls() {
        let query = FixedRangeQuery::returning(vec![SeriesPoint::new(0, 1.0)]);
        let points = query.query("up", &window()).await.unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(query.calls(), 1);
        assert_eq!(query.windows(), vec![window()]);
    }
}
