//! Process signal handling.

use telesynth_types::{Shutdown, ShutdownTrigger};

/// Resolve on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, finishing current iteration");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, finishing current iteration");
        }
    }
}

/// Shutdown handle fired by the first process signal.
pub fn install() -> Shutdown {
    let (trigger, shutdown) = ShutdownTrigger::channel();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });
    shutdown
}
