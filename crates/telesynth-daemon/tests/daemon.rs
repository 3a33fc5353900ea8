//! Subcommands against a mock metrics backend.

use clap::Parser;
use serde_json::json;
use telesynth_daemon::cli::{Command, ForecastArgs, GenerateArgs};
use telesynth_daemon::{app, Cli, DaemonError};
use telesynth_types::Shutdown;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn forecast_args(args: &[String]) -> ForecastArgs {
    let cli = Cli::try_parse_from(
        ["telesynth".to_string(), "forecast".to_string()]
            .into_iter()
            .chain(args.iter().cloned()),
    )
    .unwrap();
    match cli.command {
        Command::Forecast(args) => args,
        Command::Generate(_) => unreachable!(),
    }
}

fn generate_args(args: &[String]) -> GenerateArgs {
    let cli = Cli::try_parse_from(
        ["telesynth".to_string(), "generate".to_string()]
            .into_iter()
            .chain(args.iter().cloned()),
    )
    .unwrap();
    match cli.command {
        Command::Generate(args) => args,
        Command::Forecast(_) => unreachable!(),
    }
}

fn matrix(points: usize) -> serde_json::Value {
    let values: Vec<serde_json::Value> = (0..points)
        .map(|i| json!([1_700_000_000 + i as i64, format!("{}", 10.0 + i as f64)]))
        .collect();
    json!({
        "status": "success",
        "data": {
            "resultType": "matrix",
            "result": [{"metric": {"__name__": "http_request_latency"}, "values": values}]
        }
    })
}

async fn posts_to(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == route)
        .count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn forecast_once_publishes_chunks_to_every_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query_range"))
        .respond_with(ResponseTemplate::new(200).set_body_json(matrix(120)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let args = forecast_args(&[
        "--query-url".to_string(),
        server.uri(),
        "--publish-url".to_string(),
        format!("{0}/a/api/v1/import,{0}/b/api/v1/import", server.uri()),
        "--predict-period".to_string(),
        "30".to_string(),
        "--chunk-size".to_string(),
        "10".to_string(),
        "--season-order".to_string(),
        "0".to_string(),
        "--once".to_string(),
    ]);

    app::forecast(&args, Shutdown::never()).await.unwrap();

    assert_eq!(posts_to(&server, "/a/api/v1/import").await, 3);
    assert_eq!(posts_to(&server, "/b/api/v1/import").await, 3);
}

#[tokio::test]
async fn forecast_once_reports_backend_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let args = forecast_args(&[
        "--query-url".to_string(),
        server.uri(),
        "--publish-url".to_string(),
        format!("{}/api/v1/import", server.uri()),
        "--once".to_string(),
    ]);

    let result = app::forecast(&args, Shutdown::never()).await;
    assert!(matches!(result, Err(DaemonError::CycleFailed(_))));
    assert_eq!(posts_to(&server, "/api/v1/import").await, 0);
}

#[tokio::test]
async fn forecast_once_with_no_data_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": {"resultType": "matrix", "result": []}
        })))
        .mount(&server)
        .await;

    let args = forecast_args(&[
        "--query-url".to_string(),
        server.uri(),
        "--publish-url".to_string(),
        format!("{}/api/v1/import", server.uri()),
        "--once".to_string(),
    ]);

    app::forecast(&args, Shutdown::never()).await.unwrap();
    assert_eq!(posts_to(&server, "/api/v1/import").await, 0);
}

#[tokio::test]
async fn generate_backfill_posts_one_batch_per_tick() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/import"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let args = generate_args(&[
        "--publish-url".to_string(),
        format!("{}/api/v1/import", server.uri()),
        "--horizon".to_string(),
        "5".to_string(),
        "--seed".to_string(),
        "11".to_string(),
    ]);

    app::generate(&args, Shutdown::never()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 5);
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(body.lines().any(|line| line.contains("\"sinusoidal_metric\"")));
    assert!(body
        .lines()
        .any(|line| line.contains("http_request_duration_seconds_bucket")));
}

#[tokio::test]
async fn generate_survives_unreachable_backend() {
    let args = generate_args(&[
        "--publish-url".to_string(),
        "http://127.0.0.1:9/api/v1/import".to_string(),
        "--horizon".to_string(),
        "2".to_string(),
    ]);

    app::generate(&args, Shutdown::never()).await.unwrap();
}

#[tokio::test]
async fn invalid_publish_url_is_a_config_error() {
    let args = generate_args(&["--publish-url".to_string(), "localhost:8428".to_string()]);
    let result = app::generate(&args, Shutdown::never()).await;
    assert!(matches!(result, Err(DaemonError::Config(_))));
}
