//! Run command - poll enabled vendors until interrupted.

use anyhow::Result;
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use portalsync_store::AppConfig;

use crate::app;

/// Runs every enabled vendor's loop concurrently until Ctrl+C or SIGTERM.
pub async fn run(config: &AppConfig) -> Result<()> {
    let vendors = app::select_vendors(config, None)?;
    let loops = app::build_loops(config, &vendors)?;

    info!(
        vendors = ?vendors,
        storage_root = %config.storage_root().display(),
        "Starting acquisition"
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let mut tasks = JoinSet::new();
    for acquisition in loops {
        let token = shutdown.clone();
        tasks.spawn(async move { acquisition.run(token).await });
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "Acquisition loop panicked");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Cancels `shutdown` on Ctrl+C or SIGTERM.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }

    shutdown.cancel();
}
