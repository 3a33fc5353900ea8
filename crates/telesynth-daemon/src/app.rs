//! Subcommand entry points.

use std::sync::Arc;
use telesynth_forecast::{CycleOutcome, ForecastLoop};
use telesynth_remote::HttpRangeQuery;
use telesynth_replay::{ReplayPlan, ReplayScheduler};
use telesynth_types::{Shutdown, SystemClock, TokioTimer};
use tracing::info;

use crate::cli::{Cli, Command, ForecastArgs, GenerateArgs};
use crate::error::{DaemonError, DaemonResult};
use crate::shutdown;

pub async fn run(cli: Cli) -> DaemonResult<()> {
    match cli.command {
        Command::Generate(args) => generate(&args, shutdown::install()).await,
        Command::Forecast(args) => forecast(&args, shutdown::install()).await,
    }
}

/// Replay the standard plan into the configured publishers.
pub async fn generate(args: &GenerateArgs, shutdown: Shutdown) -> DaemonResult<()> {
    let config = args.replay_config();
    let plan = ReplayPlan::standard(&args.job);

    if args.print_config {
        let effective = serde_json::json!({ "replay": config, "plan": plan });
        println!("{}", serde_json::to_string_pretty(&effective)?);
        return Ok(());
    }

    let publishers = args.publish.publishers()?;
    let scheduler = ReplayScheduler::new(
        config,
        plan,
        publishers,
        Arc::new(SystemClock),
        Arc::new(TokioTimer),
    )?;

    let report = scheduler.run(shutdown).await?;
    info!(
        ticks = report.ticks,
        samples = report.samples,
        failed_pushes = report.failed_pushes,
        cancelled = report.cancelled,
        "Generation complete"
    );
    Ok(())
}

/// Run the forecast loop, or a single cycle with `--once`.
pub async fn forecast(args: &ForecastArgs, shutdown: Shutdown) -> DaemonResult<()> {
    let config = args.forecast_config();
    let forecaster = args.forecaster()?;

    if args.print_config {
        let effective = serde_json::json!({ "forecast": config, "model": forecaster });
        println!("{}", serde_json::to_string_pretty(&effective)?);
        return Ok(());
    }

    let publishers = args.publish.publishers()?;
    let query = HttpRangeQuery::new(args.query_url.clone())?;
    let forecast = ForecastLoop::new(
        config,
        Arc::new(query),
        Arc::new(forecaster),
        publishers,
        Arc::new(SystemClock),
        Arc::new(TokioTimer),
    )?;

    if !args.once {
        forecast.run(shutdown).await;
        return Ok(());
    }

    match forecast.run_cycle().await.outcome {
        CycleOutcome::QueryFailed(e) => Err(DaemonError::CycleFailed(e.to_string())),
        CycleOutcome::ModelFailed(e) => Err(DaemonError::CycleFailed(e.to_string())),
        CycleOutcome::Published(summary) if !summary.failures.is_empty() => {
            Err(DaemonError::CycleFailed(format!(
                "{} of {} pushes failed",
                summary.failures.len(),
                summary.failures.len() + summary.delivered
            )))
        }
        _ => Ok(()),
    }
}
