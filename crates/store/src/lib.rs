//! Content store abstraction and implementations for Doclink.
//!
//! This crate provides the durable side of the system:
//! - User, domain, file, and sealed-content records
//! - Single-transaction batch writes (metadata and content land together
//!   or not at all)
//! - The quota ledger: tier ceilings enforced inside the same unit of
//!   work as the write they guard
//! - Question-counting sessions with a rolling 24-hour window

pub mod error;
pub mod models;
pub mod postgres;
pub mod repos;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use postgres::PostgresStore;
pub use repos::{
    ContentRepo, DomainContent, DomainOverview, DomainRepo, FileRepo, QuestionAdmission,
    SessionRepo, UserOverview, UserProfile, UserRepo,
};
pub use store::{ContentStore, SqliteStore};

use doclink_core::config::StoreConfig;
use std::sync::Arc;

/// Create a content store from configuration.
pub async fn from_config(config: &StoreConfig) -> StoreResult<Arc<dyn ContentStore>> {
    match config {
        StoreConfig::Sqlite { path } => {
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store) as Arc<dyn ContentStore>)
        }
        StoreConfig::Postgres {
            url,
            host,
            port,
            username,
            password,
            database,
            ssl_mode,
            max_connections,
            statement_timeout_ms,
        } => {
            let store = if let Some(url) = url {
                // URL takes precedence when both are provided
                tracing::info!("Connecting to PostgreSQL using connection URL");
                PostgresStore::from_url(url, *max_connections, *statement_timeout_ms).await?
            } else if let (Some(host), Some(database)) = (host.as_ref(), database.as_ref()) {
                PostgresStore::from_params(
                    host,
                    port.unwrap_or(5432),
                    username.as_deref(),
                    password.as_deref(),
                    database,
                    *ssl_mode,
                    *max_connections,
                    *statement_timeout_ms,
                )
                .await?
            } else {
                return Err(StoreError::Config(
                    "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                ));
            };
            Ok(Arc::new(store) as Arc<dyn ContentStore>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_config_sqlite() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("doclink.db");
        let config = StoreConfig::Sqlite {
            path: db_path.clone(),
        };

        let store = from_config(&config).await.unwrap();
        store.health_check().await.unwrap();
        assert!(db_path.exists());
    }
}
