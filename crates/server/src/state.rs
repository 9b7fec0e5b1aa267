//! Application state shared across handlers.

use crate::activation::DomainActivation;
use crate::pipeline::StagingPipeline;
use doclink_cache::WorkingSetCache;
use doclink_core::config::AppConfig;
use doclink_engine::{AnswerEngine, DocumentReader, EmbeddingEngine};
use doclink_sealer::ContentSealer;
use doclink_store::ContentStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Durable content store and quota ledger.
    pub store: Arc<dyn ContentStore>,
    /// Working-set and staging cache.
    pub cache: Arc<dyn WorkingSetCache>,
    /// Content sealer.
    pub sealer: Arc<ContentSealer>,
    /// Document reader.
    pub reader: Arc<dyn DocumentReader>,
    /// Embedding engine.
    pub embedder: Arc<dyn EmbeddingEngine>,
    /// Answer ranking engine.
    pub answerer: Arc<dyn AnswerEngine>,
    /// Domain activation orchestrator.
    pub activation: Arc<DomainActivation>,
    /// Upload staging pipeline.
    pub pipeline: Arc<StagingPipeline>,
    /// HTTP client for URL ingestion.
    pub http: reqwest::Client,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Panics
    ///
    /// Panics if configuration validation fails; startup is the place
    /// to fail fast on a bad config.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn ContentStore>,
        cache: Arc<dyn WorkingSetCache>,
        sealer: ContentSealer,
        reader: Arc<dyn DocumentReader>,
        embedder: Arc<dyn EmbeddingEngine>,
        answerer: Arc<dyn AnswerEngine>,
    ) -> Self {
        if let Err(error) = config.validate() {
            panic!("Invalid configuration: {error}");
        }

        let sealer = Arc::new(sealer);
        let activation = Arc::new(DomainActivation::new(
            store.clone(),
            cache.clone(),
            sealer.clone(),
        ));
        let pipeline = Arc::new(StagingPipeline::new(
            store.clone(),
            cache.clone(),
            sealer.clone(),
            activation.clone(),
            reader.clone(),
            embedder.clone(),
        ));

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(
                config.server.url_fetch_timeout_secs,
            ))
            .build()
            .expect("failed to build HTTP client");

        Self {
            config: Arc::new(config),
            store,
            cache,
            sealer,
            reader,
            embedder,
            answerer,
            activation,
            pipeline,
            http,
        }
    }
}
