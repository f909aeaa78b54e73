//! tokwav recording processor (tokwav-rp) - Main entry point
//!
//! Loads configuration and the neural decoder once, opens the metadata
//! database and blob bucket, then serves the recordings API until
//! Ctrl+C / SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tokwav_common::config::load_toml_config;
use tokwav_rp::codec::CodecDecoder;
use tokwav_rp::config::{CliOverrides, ServiceConfig, TomlConfig};
use tokwav_rp::storage::{BlobStore, FsBlobStore};
use tokwav_rp::{create_router, db, AppState};

/// Command-line arguments for tokwav-rp
#[derive(Parser, Debug)]
#[command(name = "tokwav-rp")]
#[command(about = "Neural-codec token to WAV recording processor")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "TOKWAV_RP_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "TOKWAV_RP_BIND_ADDR")]
    bind_addr: Option<String>,

    /// Root folder holding the blob buckets and database
    #[arg(short, long, env = "TOKWAV_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// SQLite database path (default: <root>/tokwav.db)
    #[arg(long, env = "TOKWAV_RP_DATABASE")]
    database: Option<PathBuf>,

    /// Decoder model directory (config.json + model.safetensors)
    #[arg(long, env = "TOKWAV_RP_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, env = "TOKWAV_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tokwav_rp=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting tokwav recording processor v{}", env!("CARGO_PKG_VERSION"));

    let toml: TomlConfig =
        load_toml_config(args.config.as_deref()).context("Failed to load configuration")?;
    let config = ServiceConfig::resolve(
        CliOverrides {
            root_folder: args.root_folder,
            bind_addr: args.bind_addr,
            port: args.port,
            database_path: args.database,
            model_dir: args.model_dir,
        },
        toml,
    )
    .context("Invalid configuration")?;

    info!("Root folder: {}", config.root_folder.display());
    info!(
        "Pipeline: batch size {}, {:?} layout, {:?} resampling",
        config.pipeline.batch_size, config.pipeline.layout, config.pipeline.resample_mode
    );

    let decoder = load_decoder(&config)?;
    info!("Decoder ready: {} (hop {})", decoder.name(), decoder.hop_length());

    let pool = db::init_database_pool(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    let blob_store: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(config.blob_root()));
    blob_store
        .ensure_bucket(&config.bucket)
        .context("Failed to prepare storage bucket")?;

    let addr = config.socket_addr()?;
    let app = create_router(AppState::new(pool.clone(), decoder, blob_store, config));

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}

#[cfg(feature = "candle")]
fn load_decoder(config: &ServiceConfig) -> Result<Arc<dyn CodecDecoder>> {
    use tokwav_rp::codec::encodec::EncodecDecoder;

    let decoder = EncodecDecoder::load(&config.model_dir, config.device)
        .map_err(|e| anyhow::anyhow!("{}", e))
        .with_context(|| format!("Failed to load decoder from {}", config.model_dir.display()))?;

    if decoder.native_rate() != config.default_source_rate {
        warn!(
            "Decoder native rate {}Hz differs from default source rate {}Hz",
            decoder.native_rate(),
            config.default_source_rate
        );
    }

    Ok(Arc::new(decoder))
}

#[cfg(not(feature = "candle"))]
fn load_decoder(config: &ServiceConfig) -> Result<Arc<dyn CodecDecoder>> {
    warn!("No decoder backend compiled in (model dir {})", config.model_dir.display());
    anyhow::bail!("tokwav-rp was built without a decoder backend; rebuild with --features candle")
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
