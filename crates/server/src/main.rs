mod api;
mod metrics;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use remedia_core::{
    config, load_config, storage, validate_config, ConversionPipeline, ConversionWorker,
    FfmpegEngine, FileResolver, FsResolver, JobStore, Scheduler, SqliteJobStore, TranscodeEngine,
};

use api::create_router;
use state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration: an explicit REMEDIA_CONFIG path must exist, the
    // default config.toml is optional
    let config = match std::env::var("REMEDIA_CONFIG") {
        Ok(path) => {
            let path = PathBuf::from(path);
            info!("Loading configuration from {:?}", path);
            load_config(&path)
                .with_context(|| format!("Failed to load config from {:?}", path))?
        }
        Err(_) => {
            let default_path = PathBuf::from("config.toml");
            if default_path.exists() {
                info!("Loading configuration from {:?}", default_path);
                load_config(&default_path)
                    .with_context(|| format!("Failed to load config from {:?}", default_path))?
            } else {
                info!("No config file found, using defaults and environment");
                config::load_config_from_env().context("Failed to load config from environment")?
            }
        }
    };

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Upload dir: {:?}", config.storage.upload_dir);
    info!("Output dir: {:?}", config.storage.output_dir);
    info!("Job database: {:?}", config.scheduler.db_path);

    // Create storage layout
    storage::ensure_layout(&config.storage)
        .await
        .context("Failed to create storage directories")?;

    // Create the transcoding engine and check the binaries are usable
    let engine: Arc<dyn TranscodeEngine> = Arc::new(FfmpegEngine::new(config.engine.clone()));
    engine
        .validate()
        .await
        .context("Transcoding engine validation failed")?;
    info!("Transcoding engine ready: {}", engine.name());

    // Create SQLite job store
    let store: Arc<dyn JobStore> = Arc::new(
        SqliteJobStore::new(&config.scheduler.db_path).context("Failed to create job store")?,
    );
    info!("Job store initialized");

    // Wire the pipeline
    let resolver: Arc<dyn FileResolver> = Arc::new(FsResolver::new(&config.storage.upload_dir));
    let worker = Arc::new(ConversionWorker::new(
        Arc::clone(&resolver),
        Arc::clone(&engine),
        &config.storage.output_dir,
    ));
    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&store),
        config.scheduler.clone(),
    ));
    let pipeline = Arc::new(ConversionPipeline::new(worker, scheduler));

    // Start the scheduler workers; interrupted jobs are re-queued here
    pipeline.start().context("Failed to start job scheduler")?;
    info!("Job scheduler started with {} workers", config.scheduler.workers);

    // Spawn the output retention sweeper
    tokio::spawn(storage::run_sweeper(config.storage.clone()));
    info!(
        "Output sweeper running (retention: {}h, interval: {}s)",
        config.storage.retention_hours, config.storage.sweep_interval_secs
    );

    // Create app state and router
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&pipeline),
        resolver,
        engine,
    ));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Stop the scheduler, letting in-flight jobs settle
    info!("Server shutting down...");
    pipeline.stop().await;
    info!("Job scheduler stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
