//! Command line and environment surface.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::time::Duration;
use telesynth_types::{parse_duration, PublishMode};

pub const DEFAULT_PUBLISH_URL: &str = "http://localhost:8428/api/v1/import";
pub const DEFAULT_QUERY_URL: &str = "http://localhost:8428";

/// Telesynth CLI
#[derive(Debug, Parser)]
#[command(name = "telesynth")]
#[command(
    about = "Telesynth - Synthetic telemetry replay and forecast republishing",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log level
    #[arg(long, global = true, env = "TELESYNTH_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long, global = true, env = "TELESYNTH_LOG_JSON")]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Replay synthetic series into the publish endpoints
    Generate(GenerateArgs),

    /// Periodically retrain a model and republish its forecast
    Forecast(ForecastArgs),
}

/// Where samples go.
#[derive(Debug, Clone, Args)]
pub struct PublishArgs {
    /// Import endpoints, comma separated
    #[arg(
        long = "publish-url",
        env = "PUBLISH_URLS",
        value_delimiter = ',',
        default_value = DEFAULT_PUBLISH_URL
    )]
    pub publish_urls: Vec<String>,

    /// Log batches instead of sending them
    #[arg(long, env = "DRY_RUN")]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReplayModeArg {
    /// Fill the past horizon at once
    Backfill,

    /// Emit one tick per interval until stopped
    Live,
}

#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub publish: PublishArgs,

    /// Replay mode
    #[arg(long, env = "REPLAY_MODE", value_enum, default_value = "backfill")]
    pub mode: ReplayModeArg,

    /// Ticks in the backfill window
    #[arg(long, env = "REPLAY_HORIZON", default_value_t = 3600)]
    pub horizon: u64,

    /// Spacing of backfill ticks
    #[arg(long, env = "REPLAY_STEP", default_value = "1s", value_parser = parse_duration)]
    pub step: Duration,

    /// Wait between live ticks
    #[arg(long, env = "REPLAY_INTERVAL", default_value = "1s", value_parser = parse_duration)]
    pub interval: Duration,

    /// Stop live mode after this many ticks
    #[arg(long, env = "REPLAY_MAX_TICKS")]
    pub max_ticks: Option<u64>,

    /// Seed for reproducible random series
    #[arg(long, env = "REPLAY_SEED")]
    pub seed: Option<u64>,

    /// Value of the `job` label
    #[arg(long, env = "REPLAY_JOB", default_value = "example")]
    pub job: String,

    /// Print the effective replay config and plan as JSON, then exit
    #[arg(long)]
    pub print_config: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub publish: PublishArgs,

    /// Base URL of the query backend
    #[arg(long, env = "QUERY_URL", default_value = DEFAULT_QUERY_URL)]
    pub query_url: String,

    /// Series to forecast
    #[arg(long, env = "QUERY", default_value = "http_request_latency")]
    pub query: String,

    /// History queried each cycle
    #[arg(long, env = "LOOKBACK", default_value = "1h", value_parser = parse_duration)]
    pub lookback: Duration,

    /// Query resolution
    #[arg(long, env = "STEP", default_value = "1s", value_parser = parse_duration)]
    pub step: Duration,

    /// Future points predicted each cycle
    #[arg(long, env = "PREDICT_PERIOD", default_value_t = 3600)]
    pub predict_period: usize,

    /// last_point or full_tail
    #[arg(long, env = "PUBLISH_MODE", default_value = "full_tail")]
    pub publish_mode: PublishMode,

    /// Samples per publish request
    #[arg(long, env = "CHUNK_SIZE", default_value_t = 1000)]
    pub chunk_size: usize,

    /// Seconds between cycles
    #[arg(long, env = "POLL_INTERVAL", default_value_t = 60)]
    pub poll_interval: u64,

    /// Output metric name, `<query>_forecast` by default
    #[arg(long, env = "FORECAST_METRIC")]
    pub forecast_metric: Option<String>,

    /// Seasonal period of the model
    #[arg(long, env = "SEASON_PERIOD", default_value = "10m", value_parser = parse_duration)]
    pub season_period: Duration,

    /// Fourier order of the seasonal term; 0 fits the trend only
    #[arg(long, env = "SEASON_ORDER", default_value_t = 5)]
    pub season_order: usize,

    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Print the effective forecast config as JSON, then exit
    #[arg(long)]
    pub print_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("telesynth").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_generate_defaults() {
        let cli = parse(&["generate"]);
        assert_eq!(cli.log_level, "info");
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.mode, ReplayModeArg::Backfill);
        assert_eq!(args.horizon, 3600);
        assert_eq!(args.step, Duration::from_secs(1));
        assert_eq!(args.job, "example");
        assert_eq!(args.publish.publish_urls, vec![DEFAULT_PUBLISH_URL]);
        assert!(!args.publish.dry_run);
    }

    #[test]
    fn test_forecast_flags() {
        let cli = parse(&[
            "forecast",
            "--query",
            "up",
            "--lookback",
            "15m",
            "--publish-mode",
            "last_point",
            "--publish-url",
            "http://a/api/v1/import,http://b/api/v1/import",
            "--json",
        ]);
        assert!(cli.json);
        let Command::Forecast(args) = cli.command else {
            panic!("expected forecast");
        };
        assert_eq!(args.query, "up");
        assert_eq!(args.lookback, Duration::from_secs(900));
        assert_eq!(args.publish_mode, PublishMode::LastPoint);
        assert_eq!(args.publish.publish_urls.len(), 2);
        assert_eq!(args.poll_interval, 60);
    }

    #[test]
    fn test_bad_duration_rejected() {
        let result = Cli::try_parse_from(["telesynth", "forecast", "--lookback", "1.5h"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_publish_mode_rejected() {
        let result = Cli::try_parse_from(["telesynth", "forecast", "--publish-mode", "all"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
