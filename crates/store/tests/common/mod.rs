//! Common test utilities and fixtures.

use doclink_core::{DomainId, DomainKind, FileId, Tier, UserId, embedding};
use doclink_store::models::{ContentRow, DomainRow, FileRow};
use doclink_store::{ContentStore, PostgresStore, SqliteStore, StoreResult, UserProfile};
use std::sync::Arc;
use tempfile::TempDir;
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use time::OffsetDateTime;
use time::macros::date;

/// A test store wrapper that cleans up on drop.
#[allow(dead_code)]
pub struct TestStore {
    pub store: Arc<dyn ContentStore>,
    sqlite_store: Arc<SqliteStore>,
    _temp_dir: TempDir,
}

impl TestStore {
    /// Create a new SQLite-backed test store.
    pub async fn new() -> StoreResult<Self> {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let store = SqliteStore::new(&db_path).await?;
        let arc_store = Arc::new(store);

        Ok(Self {
            store: arc_store.clone(),
            sqlite_store: arc_store,
            _temp_dir: temp_dir,
        })
    }

    /// Get a reference to the content store.
    pub fn store(&self) -> Arc<dyn ContentStore> {
        self.store.clone()
    }

    /// Get the SQLite connection pool for raw queries.
    #[allow(dead_code)]
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Sqlite> {
        self.sqlite_store.pool()
    }
}

/// PostgreSQL test store wrapper that manages a testcontainer.
#[allow(dead_code)]
pub struct PostgresTestStore {
    pub store: Arc<dyn ContentStore>,
    _container: ContainerAsync<Postgres>,
}

impl PostgresTestStore {
    /// Create a new PostgreSQL test store with a testcontainer.
    #[allow(dead_code)]
    pub async fn new() -> Result<Self, String> {
        let container = Postgres::default()
            .with_tag("15-alpine")
            .start()
            .await
            .map_err(|e| format!("failed to start PostgreSQL container: {e}"))?;

        let host = container.get_host().await.map_err(|e| e.to_string())?;
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .map_err(|e| e.to_string())?;

        let url = format!("postgres://postgres:postgres@{host}:{port}/postgres");
        let store = PostgresStore::from_url(&url, 5, None)
            .await
            .map_err(|e| e.to_string())?;

        Ok(Self {
            store: Arc::new(store),
            _container: container,
        })
    }
}

/// Run a test against both SQLite and PostgreSQL backends.
///
/// The PostgreSQL half needs Docker; it skips with a message when the
/// container cannot start or SKIP_POSTGRES_TESTS is set.
#[allow(dead_code)]
pub async fn run_store_test_both<F, Fut>(test_fn: F)
where
    F: Fn(Arc<dyn ContentStore>) -> Fut + Clone,
    Fut: std::future::Future<Output = ()>,
{
    let sqlite = TestStore::new().await.expect("Failed to create test store");
    test_fn.clone()(sqlite.store()).await;

    if std::env::var("SKIP_POSTGRES_TESTS").is_err() {
        match PostgresTestStore::new().await {
            Ok(postgres) => test_fn(postgres.store.clone()).await,
            Err(err) => eprintln!("Skipping PostgreSQL store tests: {err}"),
        }
    }
}

/// Provision a user at the given tier.
pub async fn make_user(store: &dyn ContentStore, tier: Tier) -> UserId {
    let user_id = UserId::new();
    store
        .upsert_user(&UserProfile {
            user_id,
            user_name: "Test".to_string(),
            user_surname: Some("User".to_string()),
            user_email: format!("{user_id}@example.com"),
            picture_url: None,
        })
        .await
        .expect("upsert_user failed");
    if tier != Tier::Free {
        store.set_tier(user_id, tier).await.expect("set_tier failed");
    }
    user_id
}

/// Create a domain of the given kind for a user.
pub async fn make_domain(store: &dyn ContentStore, user_id: UserId, kind: DomainKind) -> DomainId {
    let domain_id = DomainId::new();
    let now = OffsetDateTime::now_utc();
    let admission = store
        .create_domain(&DomainRow {
            domain_id: *domain_id.as_uuid(),
            user_id: *user_id.as_uuid(),
            domain_name: "Test Domain".to_string(),
            domain_type: kind.as_i16(),
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("create_domain failed");
    assert!(admission.is_granted(), "domain creation denied in fixture");
    domain_id
}

/// Build a file row with `sentences` sealed as plain bytes (store tests
/// do not exercise the sealer) plus aligned content rows.
pub fn make_file_batch(
    user_id: UserId,
    domain_id: DomainId,
    file_name: &str,
    sentences: &[&str],
) -> (FileId, FileRow, Vec<ContentRow>) {
    let file_id = FileId::new();
    let file = FileRow {
        file_id: *file_id.as_uuid(),
        domain_id: *domain_id.as_uuid(),
        user_id: *user_id.as_uuid(),
        file_name: file_name.to_string(),
        file_modified_date: date!(2025 - 01 - 15),
        file_upload_date: OffsetDateTime::now_utc(),
    };
    let content = sentences
        .iter()
        .enumerate()
        .map(|(i, sentence)| ContentRow {
            file_id: *file_id.as_uuid(),
            position: i as i32,
            sentence: sentence.as_bytes().to_vec(),
            page_number: 1,
            is_header: false,
            is_table: false,
            embedding: embedding::vec_to_blob(&test_embedding(i)),
        })
        .collect();
    (file_id, file, content)
}

/// A deterministic embedding vector for test content.
#[allow(dead_code)]
pub fn test_embedding(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; doclink_core::EMBEDDING_DIM];
    v[seed % doclink_core::EMBEDDING_DIM] = 1.0;
    v
}

/// Insert one file with the given sentences, asserting admission.
#[allow(dead_code)]
pub async fn seed_file(
    store: &dyn ContentStore,
    user_id: UserId,
    domain_id: DomainId,
    file_name: &str,
    sentences: &[&str],
) -> FileId {
    let (file_id, file, content) = make_file_batch(user_id, domain_id, file_name, sentences);
    let admission = store
        .insert_file_batch(user_id, &[file], &content)
        .await
        .expect("insert_file_batch failed");
    assert!(admission.is_granted(), "file batch denied in fixture");
    file_id
}
