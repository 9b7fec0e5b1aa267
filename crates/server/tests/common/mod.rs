//! Common test utilities: an assembled store + cache + sealer + engine
//! harness.

use doclink_cache::{MemoryCache, WorkingSetCache};
use doclink_core::{DomainId, DomainKind, Tier, UserId};
use doclink_engine::{
    AnswerEngine, CosineSearcher, DocumentReader, EmbeddingEngine, HashEmbedder, PlainReader,
};
use doclink_sealer::{ContentSealer, SealKey};
use doclink_server::{DomainActivation, StagingPipeline};
use doclink_store::models::DomainRow;
use doclink_store::{ContentStore, SqliteStore, UserProfile};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use time::OffsetDateTime;

/// A fully wired test harness over SQLite and the in-process cache.
#[allow(dead_code)]
pub struct TestHarness {
    pub store: Arc<dyn ContentStore>,
    pub cache: Arc<dyn WorkingSetCache>,
    pub memory_cache: Arc<MemoryCache>,
    pub sealer: Arc<ContentSealer>,
    pub reader: Arc<dyn DocumentReader>,
    pub embedder: Arc<dyn EmbeddingEngine>,
    pub answerer: Arc<dyn AnswerEngine>,
    pub activation: Arc<DomainActivation>,
    pub pipeline: Arc<StagingPipeline>,
    sqlite: Arc<SqliteStore>,
    _temp_dir: TempDir,
}

impl TestHarness {
    /// Harness with generous lifetimes.
    pub async fn new() -> Self {
        Self::with_ttls(Duration::from_secs(3600), Duration::from_secs(3600)).await
    }

    /// Harness with explicit cache lifetimes for expiry tests.
    pub async fn with_ttls(staging_ttl: Duration, working_set_idle: Duration) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let sqlite = Arc::new(
            SqliteStore::new(temp_dir.path().join("test.db"))
                .await
                .expect("Failed to create store"),
        );
        let store: Arc<dyn ContentStore> = sqlite.clone();

        let memory_cache = Arc::new(MemoryCache::with_ttls(staging_ttl, working_set_idle, 100));
        let cache: Arc<dyn WorkingSetCache> = memory_cache.clone();

        let sealer = Arc::new(ContentSealer::new(&SealKey::generate()));
        let reader: Arc<dyn DocumentReader> = Arc::new(PlainReader::new());
        let embedder: Arc<dyn EmbeddingEngine> = Arc::new(HashEmbedder::default());
        let answerer: Arc<dyn AnswerEngine> = Arc::new(CosineSearcher::new(embedder.clone()));

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

        Self {
            store,
            cache,
            memory_cache,
            sealer,
            reader,
            embedder,
            answerer,
            activation,
            pipeline,
            sqlite,
            _temp_dir: temp_dir,
        }
    }

    /// The raw SQLite pool, for corrupting state behind the store's back.
    #[allow(dead_code)]
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Sqlite> {
        self.sqlite.pool()
    }

    /// Provision a user at a tier; returns the protected default domain
    /// (seeded with the user guide).
    pub async fn provision(&self, tier: Tier) -> (UserId, DomainId) {
        let user_id = UserId::new();
        let default_domain = doclink_server::bootstrap::provision_user(
            self.store.as_ref(),
            self.sealer.as_ref(),
            self.reader.as_ref(),
            self.embedder.as_ref(),
            &UserProfile {
                user_id,
                user_name: "Test".to_string(),
                user_surname: None,
                user_email: format!("{user_id}@example.com"),
                picture_url: None,
            },
        )
        .await
        .expect("provisioning failed")
        .expect("fresh user must get a default domain");

        if tier != Tier::Free {
            self.store.set_tier(user_id, tier).await.expect("set_tier failed");
        }
        (user_id, default_domain)
    }

    /// Create an additional user domain directly against the store.
    #[allow(dead_code)]
    pub async fn make_domain(&self, user_id: UserId, name: &str) -> DomainId {
        let domain_id = DomainId::new();
        let now = OffsetDateTime::now_utc();
        let admission = self
            .store
            .create_domain(&DomainRow {
                domain_id: *domain_id.as_uuid(),
                user_id: *user_id.as_uuid(),
                domain_name: name.to_string(),
                domain_type: DomainKind::UserCreated.as_i16(),
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("create_domain failed");
        assert!(admission.is_granted(), "domain creation denied in fixture");
        domain_id
    }

    /// Stage a plain-text document for the user.
    #[allow(dead_code)]
    pub async fn stage_text(&self, user_id: UserId, name: &str, text: &str) {
        self.pipeline
            .stage_document(
                user_id,
                name,
                OffsetDateTime::now_utc().date(),
                text.as_bytes(),
            )
            .await
            .expect("staging failed");
    }
}
