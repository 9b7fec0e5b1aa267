//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted upload body size in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Timeout for URL ingestion fetches, in seconds.
    #[serde(default = "default_url_fetch_timeout_secs")]
    pub url_fetch_timeout_secs: u64,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024 // 20 MiB
}

fn default_url_fetch_timeout_secs() -> u64 {
    15
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
            url_fetch_timeout_secs: default_url_fetch_timeout_secs(),
        }
    }
}

/// PostgreSQL SSL mode configuration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PgSslMode {
    /// Disable SSL/TLS entirely.
    Disable,
    /// Prefer SSL/TLS but allow unencrypted connections (default).
    #[default]
    Prefer,
    /// Require SSL/TLS for all connections.
    Require,
}

/// Content store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// SQLite database (recommended for testing and small deployments).
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
    /// PostgreSQL database.
    Postgres {
        /// Connection URL (optional if using individual fields).
        /// Takes precedence over individual fields if both are provided.
        url: Option<String>,
        /// Database host.
        host: Option<String>,
        /// Database port (default: 5432).
        #[serde(default = "default_pg_port")]
        port: Option<u16>,
        /// Database username.
        username: Option<String>,
        /// Database password.
        /// WARNING: Prefer the DOCLINK_STORE__PASSWORD env var over storing in config.
        password: Option<String>,
        /// Database name.
        database: Option<String>,
        /// SSL mode for connections.
        ssl_mode: Option<PgSslMode>,
        /// Maximum connections in the pool.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        /// Statement timeout in milliseconds. PostgreSQL cancels queries
        /// exceeding this duration; the surrounding transaction rolls
        /// back, so a timed-out batch write never commits partially.
        #[serde(default = "default_statement_timeout_ms")]
        statement_timeout_ms: Option<u64>,
    },
}

fn default_pg_port() -> Option<u16> {
    Some(5432)
}

fn default_max_connections() -> u32 {
    10
}

fn default_statement_timeout_ms() -> Option<u64> {
    Some(30_000)
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/doclink.db"),
        }
    }
}

impl StoreConfig {
    /// Validate store configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StoreConfig::Sqlite { .. } => Ok(()),
            StoreConfig::Postgres {
                url,
                host,
                database,
                ..
            } => match (url.as_ref(), host.as_ref(), database.as_ref()) {
                (Some(_), _, _) => Ok(()),
                (None, Some(_), Some(_)) => Ok(()),
                (None, None, _) => {
                    Err("postgres config requires either 'url' or 'host' + 'database'".to_string())
                }
                (None, Some(_), None) => {
                    Err("postgres config requires 'database' when using individual fields"
                        .to_string())
                }
            },
        }
    }
}

/// Working-set and staging cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Fixed lifetime for staged uploads, in seconds. Entries that are
    /// never committed expire silently after this long.
    #[serde(default = "default_staging_ttl_secs")]
    pub staging_ttl_secs: u64,
    /// Idle lifetime for working sets, in seconds. Any activity on the
    /// user's working set restarts the clock.
    #[serde(default = "default_working_set_idle_secs")]
    pub working_set_idle_secs: u64,
    /// Maximum users with resident working sets before least-recently-used
    /// eviction kicks in.
    #[serde(default = "default_max_resident_users")]
    pub max_resident_users: u64,
}

fn default_staging_ttl_secs() -> u64 {
    3600 // 1 hour
}

fn default_working_set_idle_secs() -> u64 {
    1800 // 30 minutes
}

fn default_max_resident_users() -> u64 {
    10_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            staging_ttl_secs: default_staging_ttl_secs(),
            working_set_idle_secs: default_working_set_idle_secs(),
            max_resident_users: default_max_resident_users(),
        }
    }
}

impl CacheConfig {
    /// Validate cache configuration for dangerous settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.staging_ttl_secs == 0 {
            return Err(
                "cache.staging_ttl_secs cannot be 0; staged uploads would expire immediately"
                    .to_string(),
            );
        }
        if self.working_set_idle_secs == 0 {
            return Err("cache.working_set_idle_secs cannot be 0".to_string());
        }
        Ok(())
    }

    pub fn staging_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.staging_ttl_secs)
    }

    pub fn working_set_idle(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.working_set_idle_secs)
    }
}

/// Content sealing key source.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SealKeyConfig {
    /// Key stored in a file (base64, 32 bytes).
    File {
        /// Path to the key file.
        path: PathBuf,
    },
    /// Key stored in an environment variable.
    Env {
        /// Environment variable name.
        var: String,
    },
    /// Key provided directly as a value (NOT recommended for production).
    Value {
        /// Base64-encoded 32-byte key.
        key: String,
    },
    /// Generate an ephemeral key (for development only; content sealed
    /// under a generated key is unreadable after restart).
    Generate,
}

/// Content sealing configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SealerConfig {
    /// Key source.
    pub key: SealKeyConfig,
}

impl Default for SealerConfig {
    fn default() -> Self {
        Self {
            key: SealKeyConfig::Generate,
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Content store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Content sealing configuration.
    #[serde(default)]
    pub sealer: SealerConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses SQLite storage, the in-process cache,
    /// and an ephemeral sealing key.
    pub fn for_testing() -> Self {
        Self::default()
    }

    /// Validate the whole configuration; fail fast on startup.
    pub fn validate(&self) -> Result<(), String> {
        self.store.validate()?;
        self.cache.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.staging_ttl_secs, 3600);
        assert_eq!(config.working_set_idle_secs, 1800);
    }

    #[test]
    fn test_cache_config_deserialize_without_fields() {
        let json = r#"{}"#;
        let config: CacheConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.staging_ttl_secs, 3600);
    }

    #[test]
    fn test_cache_config_rejects_zero_ttl() {
        let config = CacheConfig {
            staging_ttl_secs: 0,
            ..CacheConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_store_config_postgres_requires_target() {
        let invalid = StoreConfig::Postgres {
            url: None,
            host: None,
            port: default_pg_port(),
            username: None,
            password: None,
            database: None,
            ssl_mode: None,
            max_connections: 10,
            statement_timeout_ms: None,
        };
        assert!(invalid.validate().is_err());

        let valid = StoreConfig::Postgres {
            url: Some("postgres://localhost/doclink".to_string()),
            host: None,
            port: default_pg_port(),
            username: None,
            password: None,
            database: None,
            ssl_mode: None,
            max_connections: 10,
            statement_timeout_ms: None,
        };
        assert!(valid.validate().is_ok());
    }

    #[test]
    fn test_app_config_roundtrip() {
        let config = AppConfig::for_testing();
        let json = serde_json::to_string(&config).unwrap();
        let decoded: AppConfig = serde_json::from_str(&json).unwrap();
        assert!(decoded.validate().is_ok());
    }
}
