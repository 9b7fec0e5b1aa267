//! Doclink server binary.

use anyhow::{Context, Result};
use clap::Parser;
use doclink_cache::{MemoryCache, WorkingSetCache};
use doclink_core::config::{AppConfig, SealKeyConfig};
use doclink_engine::{
    AnswerEngine, CosineSearcher, DocumentReader, EmbeddingEngine, HashEmbedder, PlainReader,
};
use doclink_sealer::{ContentSealer, SealKey};
use doclink_server::{AppState, create_router};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Doclink - a document question-answering backend
#[derive(Parser, Debug)]
#[command(name = "doclinkd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "DOCLINK_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Doclink v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration (file is optional, env vars can provide/override everything)
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::info!("No config file found at {}; using defaults and environment", args.config);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("DOCLINK_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    if let Err(error) = config.validate() {
        anyhow::bail!("invalid configuration: {error}");
    }

    // Initialize the content store and verify connectivity before
    // accepting requests.
    let store = doclink_store::from_config(&config.store)
        .await
        .context("failed to initialize content store")?;
    store
        .health_check()
        .await
        .context("content store health check failed")?;
    tracing::info!("Content store initialized");

    // Initialize the working-set cache and its housekeeping task.
    let memory_cache = Arc::new(MemoryCache::new(&config.cache));
    spawn_cache_maintenance(memory_cache.clone());
    let cache: Arc<dyn WorkingSetCache> = memory_cache;
    tracing::info!("Working-set cache initialized");

    // Load the sealing key.
    let sealer = load_sealer(&config.sealer.key).await?;

    // Built-in engines; heavier ones substitute at these seams.
    let reader: Arc<dyn DocumentReader> = Arc::new(PlainReader::new());
    let embedder: Arc<dyn EmbeddingEngine> = Arc::new(HashEmbedder::default());
    let answerer: Arc<dyn AnswerEngine> = Arc::new(CosineSearcher::new(embedder.clone()));

    // Create application state and router.
    let state = AppState::new(config.clone(), store, cache, sealer, reader, embedder, answerer);
    let app = create_router(state);

    // Parse bind address and serve.
    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Load the content sealer from configuration.
async fn load_sealer(config: &SealKeyConfig) -> Result<ContentSealer> {
    let key = match config {
        SealKeyConfig::File { path } => {
            let key_data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read key file: {}", path.display()))?;
            SealKey::from_base64(key_data.trim()).context("failed to parse sealing key")?
        }
        SealKeyConfig::Env { var } => {
            let key_data =
                std::env::var(var).with_context(|| format!("sealing key env var not set: {var}"))?;
            SealKey::from_base64(key_data.trim()).context("failed to parse sealing key")?
        }
        SealKeyConfig::Value { key } => {
            tracing::warn!("Using inline sealing key (not recommended for production)");
            SealKey::from_base64(key.trim()).context("failed to parse sealing key")?
        }
        SealKeyConfig::Generate => {
            tracing::warn!(
                "Generating ephemeral sealing key; content sealed under it is unreadable after restart"
            );
            SealKey::generate()
        }
    };
    Ok(ContentSealer::new(&key))
}

/// Periodically run the cache's pending housekeeping (expiry sweeps).
fn spawn_cache_maintenance(cache: Arc<MemoryCache>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            cache.maintain();
        }
    });
}
