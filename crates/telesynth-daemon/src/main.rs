//! Telesynth - Synthetic telemetry replay and forecast republishing

use clap::Parser;
use telesynth_daemon::{app, telemetry, Cli, DaemonResult};

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    telemetry::init(&cli.log_level, cli.json);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting telesynth");

    app::run(cli).await
}
