use clap::Parser;
use gridcast_core::kernel::LifeRule;
use gridcast_worker::{CliArgs, WorkerConfig, WorkerService};
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = WorkerConfig::try_from(args)?;
    tracing::info!(
        port = config.port,
        threads = config.threads,
        idle_timeout_secs = config.idle_timeout.as_secs(),
        "starting gridcast worker"
    );

    let service = WorkerService::new(config, Arc::new(LifeRule));
    tokio::select! {
        res = service.run() => {
            res?;
        }
        () = shutdown_signal() => {
            tracing::info!("shutdown signal received, terminating gracefully...");
        }
    }

    service.shutdown().await;
    tracing::info!("worker shut down successfully");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("received SIGTERM signal");
        },
    }
}
