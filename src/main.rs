//! MCQ Manager - Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use mcq_manager::{
    CandleT5Loader, ManagerConfig, ModelManager, ModelTrainer, RegistryStore, api, metrics,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

#[derive(Parser, Debug)]
#[command(name = "mcq-manager")]
#[command(about = "MCQ model lifecycle manager", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override API port
    #[arg(long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format (json or pretty)
    #[arg(long, default_value = "json")]
    log_format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    match cli.log_format.as_str() {
        "pretty" => {
            tracing_subscriber::fmt()
                .with_env_filter(&cli.log_level)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(&cli.log_level)
                .json()
                .init();
        }
    }

    tracing::info!("Starting MCQ Manager");

    // Load configuration
    let mut config = ManagerConfig::load(cli.config)?;

    // CLI overrides
    if let Some(port) = cli.port {
        config.api_port = port;
    }

    config.validate()?;

    tracing::info!(
        api_port = config.api_port,
        registry_file = ?config.registry_file,
        models_dir = ?config.models_dir,
        "Configuration loaded"
    );

    // Setup metrics
    let prometheus_handle = metrics::setup_metrics()?;

    // Open the registry and wire up the manager
    let registry = Arc::new(RegistryStore::open(config.registry_file.clone()).await?);
    let manager = Arc::new(ModelManager::new(
        registry.clone(),
        Arc::new(CandleT5Loader::new()),
        config.models_dir.clone(),
    ));

    if config.scan_on_startup {
        match manager.scan().await {
            Ok(discovered) => {
                tracing::info!(discovered = discovered.len(), "Startup scan complete");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Startup scan failed");
            }
        }
    }
    metrics::update_registered_count(registry.count().await);

    let trainer = Arc::new(ModelTrainer::new(config.trainer.clone()));

    // Setup API
    let app_state = api::AppState {
        manager,
        trainer,
        session: Arc::new(api::ModelSession::new()),
        prometheus_handle,
    };

    let app = api::create_router(app_state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.api_port));
    tracing::info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind API server")?;

    // Graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    tracing::info!("Shutting down...");

    // Persist the registry one last time
    registry.save().await?;

    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }
}
