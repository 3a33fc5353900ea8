//! Conversion of command line settings into loop configuration.

use std::sync::Arc;
use std::time::Duration;
use telesynth_forecast::{ForecastConfig, Seasonality, SeasonalTrendForecaster};
use telesynth_remote::{HttpPublisher, LogPublisher, Publisher};
use telesynth_replay::{ReplayConfig, ReplayMode};

use crate::cli::{ForecastArgs, GenerateArgs, PublishArgs, ReplayModeArg};
use crate::error::{DaemonError, DaemonResult};

impl PublishArgs {
    /// Non-empty endpoint list, trimmed.
    pub fn endpoints(&self) -> DaemonResult<Vec<String>> {
        let endpoints: Vec<String> = self
            .publish_urls
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect();

        if endpoints.is_empty() {
            return Err(DaemonError::Config(
                "at least one publish URL is required".to_string(),
            ));
        }
        if let Some(bad) = endpoints
            .iter()
            .find(|url| !(url.starts_with("http://") || url.starts_with("https://")))
        {
            return Err(DaemonError::Config(format!(
                "publish URL {:?} must start with http:// or https://",
                bad
            )));
        }
        Ok(endpoints)
    }

    /// One publisher per endpoint, or a single logging publisher on dry run.
    pub fn publishers(&self) -> DaemonResult<Vec<Arc<dyn Publisher>>> {
        if self.dry_run {
            return Ok(vec![Arc::new(LogPublisher::default())]);
        }
        self.endpoints()?
            .into_iter()
            .map(|endpoint| {
                HttpPublisher::new(endpoint)
                    .map(|publisher| Arc::new(publisher) as Arc<dyn Publisher>)
                    .map_err(DaemonError::from)
            })
            .collect()
    }
}

impl GenerateArgs {
    pub fn replay_config(&self) -> ReplayConfig {
        let mode = match self.mode {
            ReplayModeArg::Backfill => ReplayMode::Backfill,
            ReplayModeArg::Live => ReplayMode::Live {
                interval: self.interval,
                max_ticks: self.max_ticks,
            },
        };
        ReplayConfig {
            mode,
            horizon: self.horizon,
            step: self.step,
            seed: self.seed,
        }
    }
}

impl ForecastArgs {
    pub fn forecast_config(&self) -> ForecastConfig {
        ForecastConfig {
            query: self.query.clone(),
            lookback: self.lookback,
            step: self.step,
            predict_period: self.predict_period,
            publish_mode: self.publish_mode,
            chunk_size: self.chunk_size,
            poll_interval: Duration::from_secs(self.poll_interval),
            metric_name: self.forecast_metric.clone(),
            ..Default::default()
        }
    }

    pub fn forecaster(&self) -> DaemonResult<SeasonalTrendForecaster> {
        if self.season_order == 0 {
            return Ok(SeasonalTrendForecaster::trend_only());
        }
        if self.season_period.is_zero() {
            return Err(DaemonError::Config(
                "season period must be positive".to_string(),
            ));
        }
        Ok(SeasonalTrendForecaster {
            seasonalities: vec![Seasonality::new(
                self.season_period.as_secs_f64(),
                self.season_order,
            )],
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;
    use telesynth_types::PublishMode;

    fn generate(args: &[&str]) -> GenerateArgs {
        let cli = Cli::try_parse_from(
            ["telesynth", "generate"].into_iter().chain(args.iter().copied()),
        )
        .unwrap();
        match cli.command {
            Command::Generate(args) => args,
            Command::Forecast(_) => panic!("expected generate"),
        }
    }

    fn forecast(args: &[&str]) -> ForecastArgs {
        let cli = Cli::try_parse_from(
            ["telesynth", "forecast"].into_iter().chain(args.iter().copied()),
        )
        .unwrap();
        match cli.command {
            Command::Forecast(args) => args,
            Command::Generate(_) => panic!("expected forecast"),
        }
    }

    #[test]
    fn test_default_replay_config() {
        let config = generate(&[]).replay_config();
        assert_eq!(config, ReplayConfig::default());
    }

    #[test]
    fn test_live_replay_config() {
        let config = generate(&[
            "--mode",
            "live",
            "--interval",
            "15m",
            "--max-ticks",
            "4",
            "--seed",
            "9",
        ])
        .replay_config();
        assert_eq!(
            config.mode,
            ReplayMode::Live {
                interval: Duration::from_secs(900),
                max_ticks: Some(4),
            }
        );
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn test_default_forecast_config() {
        let config = forecast(&[]).forecast_config();
        assert_eq!(config, ForecastConfig::default());
        assert_eq!(config.publish_mode, PublishMode::FullTail);
    }

    #[test]
    fn test_forecaster_from_flags() {
        let forecaster = forecast(&["--season-period", "1h", "--season-order", "3"])
            .forecaster()
            .unwrap();
        assert_eq!(forecaster.seasonalities, vec![Seasonality::new(3600.0, 3)]);

        let trend = forecast(&["--season-order", "0"]).forecaster().unwrap();
        assert!(trend.seasonalities.is_empty());

        assert!(forecast(&["--season-period", "0s"]).forecaster().is_err());
    }

    #[test]
    fn test_endpoints_validation() {
        let args = PublishArgs {
            publish_urls: vec![" http://a/api/v1/import ".to_string(), String::new()],
            dry_run: false,
        };
        assert_eq!(args.endpoints().unwrap(), vec!["http://a/api/v1/import"]);

        let empty = PublishArgs {
            publish_urls: vec![" ".to_string()],
            dry_run: false,
        };
        assert!(matches!(empty.endpoints(), Err(DaemonError::Config(_))));

        let bad = PublishArgs {
            publish_urls: vec!["localhost:8428".to_string()],
            dry_run: false,
        };
        assert!(bad.endpoints().is_err());
    }

    #[test]
    fn test_dry_run_uses_log_publisher() {
        let args = PublishArgs {
            publish_urls: Vec::new(),
            dry_run: true,
        };
        let publishers = args.publishers().unwrap();
        assert_eq!(publishers.len(), 1);
        assert_eq!(publishers[0].name(), "dry-run");
    }

    #[test]
    fn test_one_http_publisher_per_endpoint() {
        let args = PublishArgs {
            publish_urls: vec![
                "http://a/api/v1/import".to_string(),
                "http://b/api/v1/import".to_string(),
            ],
            dry_run: false,
        };
        let names: Vec<String> = args
            .publishers()
            .unwrap()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["http://a/api/v1/import", "http://b/api/v1/import"]);
    }
}
