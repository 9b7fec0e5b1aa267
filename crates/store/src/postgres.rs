//! PostgreSQL-based content store implementation.

use crate::error::{StoreError, StoreResult};
use crate::models::{ContentRow, DomainRow, FileRow, SessionRow, UserRow};
use crate::repos::content::{ContentReadRow, assemble_domain_content, validate_batch};
use crate::repos::{
    ContentRepo, DomainContent, DomainRepo, FileRepo, QuestionAdmission, SessionRepo, UserOverview,
    UserProfile, UserRepo,
};
use crate::store::{ContentStore, group_overview, parse_tier, schema_statements};
use async_trait::async_trait;
use doclink_core::config::PgSslMode;
use doclink_core::{
    Admission, DomainDeletion, DomainId, DomainKind, FileId, QuotaDenied, QuotaKind, SessionId,
    UserId,
};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode as SqlxPgSslMode};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// PostgreSQL schema (embedded).
const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

/// PostgreSQL-based content store.
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection URL.
    pub async fn from_url(
        url: &str,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> StoreResult<Self> {
        let opts = PgConnectOptions::from_str(url).map_err(StoreError::Database)?;
        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    /// Create a new PostgreSQL store from individual connection parameters.
    ///
    /// This allows credentials to be passed separately, enabling better
    /// secret management (e.g., passwords via environment variables).
    #[allow(clippy::too_many_arguments)]
    pub async fn from_params(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        database: &str,
        ssl_mode: Option<PgSslMode>,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> StoreResult<Self> {
        let mut opts = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);

        if let Some(user) = username {
            opts = opts.username(user);
        }
        if let Some(pass) = password {
            opts = opts.password(pass);
        }
        if let Some(mode) = ssl_mode {
            let sqlx_mode = match mode {
                PgSslMode::Disable => SqlxPgSslMode::Disable,
                PgSslMode::Prefer => SqlxPgSslMode::Prefer,
                PgSslMode::Require => SqlxPgSslMode::Require,
            };
            opts = opts.ssl_mode(sqlx_mode);
        }

        // Log connection info without password
        tracing::info!(
            host = host,
            port = port,
            database = database,
            username = username.unwrap_or("<none>"),
            "Connecting to PostgreSQL"
        );

        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    /// Internal: connect to PostgreSQL with the given options.
    async fn connect(
        mut opts: PgConnectOptions,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> StoreResult<Self> {
        // A statement timeout turns hung queries into errors; the
        // surrounding transaction rolls back, so a timed-out batch write
        // never commits partially.
        if let Some(timeout_ms) = statement_timeout_ms {
            opts = opts.options([("statement_timeout", format!("{timeout_ms}ms"))]);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

#[async_trait]
impl ContentStore for PostgresStore {
    async fn migrate(&self) -> StoreResult<()> {
        // PostgreSQL doesn't allow multiple statements in a single
        // prepared statement, so the schema runs statement by statement.
        for statement in schema_statements(POSTGRES_SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UserRepo for PostgresStore {
    async fn upsert_user(&self, profile: &UserProfile) -> StoreResult<UserRow> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO user_info (user_id, user_name, user_surname, user_email, user_type, picture_url, created_at)
            VALUES ($1, $2, $3, $4, 'free', $5, $6)
            ON CONFLICT (user_id) DO UPDATE SET
                user_name = EXCLUDED.user_name,
                user_surname = EXCLUDED.user_surname,
                user_email = EXCLUDED.user_email,
                picture_url = EXCLUDED.picture_url
            RETURNING *
            "#,
        )
        .bind(profile.user_id.as_uuid())
        .bind(&profile.user_name)
        .bind(&profile.user_surname)
        .bind(&profile.user_email)
        .bind(&profile.picture_url)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_user(&self, user_id: UserId) -> StoreResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM user_info WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn set_tier(&self, user_id: UserId, tier: doclink_core::Tier) -> StoreResult<()> {
        let result = sqlx::query("UPDATE user_info SET user_type = $1 WHERE user_id = $2")
            .bind(tier.as_str())
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {user_id} not found")));
        }
        Ok(())
    }

    async fn user_overview(&self, user_id: UserId) -> StoreResult<Option<UserOverview>> {
        let Some(user) = self.get_user(user_id).await? else {
            return Ok(None);
        };

        let domains = self.list_user_domains(user_id).await?;
        let files = sqlx::query_as::<_, FileRow>(
            "SELECT * FROM file_info WHERE user_id = $1 ORDER BY file_upload_date",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let rolling_question_count = self.rolling_question_count(user_id).await?;

        Ok(Some(group_overview(
            user,
            domains,
            files,
            rolling_question_count,
        )))
    }
}

#[async_trait]
impl DomainRepo for PostgresStore {
    async fn create_domain(&self, domain: &DomainRow) -> StoreResult<Admission> {
        let mut tx = self.pool.begin().await?;

        // Lock the owner row: concurrent creations for the same user
        // serialize here, so the count below is race-free.
        let user_type: Option<String> =
            sqlx::query_scalar("SELECT user_type FROM user_info WHERE user_id = $1 FOR UPDATE")
                .bind(domain.user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(user_type) = user_type else {
            return Err(StoreError::NotFound(format!(
                "user {} not found",
                domain.user_id
            )));
        };
        let tier = parse_tier(&user_type)?;

        let current: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM domain_info WHERE user_id = $1")
                .bind(domain.user_id)
                .fetch_one(&mut *tx)
                .await?;

        let limit = tier.max_domains();
        if current as u64 >= limit {
            tx.rollback().await?;
            return Ok(Admission::Denied(QuotaDenied {
                kind: QuotaKind::Domains,
                current: current as u64,
                limit,
            }));
        }

        sqlx::query(
            "INSERT INTO domain_info (domain_id, user_id, domain_name, domain_type, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(domain.domain_id)
        .bind(domain.user_id)
        .bind(&domain.domain_name)
        .bind(domain.domain_type)
        .bind(domain.created_at)
        .bind(domain.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Admission::Granted)
    }

    async fn get_domain(&self, domain_id: DomainId) -> StoreResult<Option<DomainRow>> {
        let row = sqlx::query_as::<_, DomainRow>("SELECT * FROM domain_info WHERE domain_id = $1")
            .bind(domain_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_user_domain(
        &self,
        user_id: UserId,
        domain_id: DomainId,
    ) -> StoreResult<Option<DomainRow>> {
        let row = sqlx::query_as::<_, DomainRow>(
            "SELECT * FROM domain_info WHERE domain_id = $1 AND user_id = $2",
        )
        .bind(domain_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_user_domains(&self, user_id: UserId) -> StoreResult<Vec<DomainRow>> {
        let rows = sqlx::query_as::<_, DomainRow>(
            "SELECT * FROM domain_info WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn rename_domain(
        &self,
        domain_id: DomainId,
        new_name: &str,
        updated_at: OffsetDateTime,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE domain_info SET domain_name = $1, updated_at = $2 WHERE domain_id = $3",
        )
        .bind(new_name)
        .bind(updated_at)
        .bind(domain_id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_domain(&self, domain_id: DomainId) -> StoreResult<DomainDeletion> {
        let mut tx = self.pool.begin().await?;

        let domain_type: Option<i16> = sqlx::query_scalar(
            "SELECT domain_type FROM domain_info WHERE domain_id = $1 FOR UPDATE",
        )
        .bind(domain_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;
        let Some(domain_type) = domain_type else {
            return Ok(DomainDeletion::NotFound);
        };
        let kind = DomainKind::from_i16(domain_type)
            .map_err(|e| StoreError::Internal(format!("corrupt domain_type: {e}")))?;
        if kind.is_protected() {
            tx.rollback().await?;
            return Ok(DomainDeletion::Protected);
        }

        // content -> files -> domain
        sqlx::query(
            "DELETE FROM file_content WHERE file_id IN (SELECT file_id FROM file_info WHERE domain_id = $1)",
        )
        .bind(domain_id.as_uuid())
        .execute(&mut *tx)
        .await?;

        let files = sqlx::query("DELETE FROM file_info WHERE domain_id = $1")
            .bind(domain_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM domain_info WHERE domain_id = $1")
            .bind(domain_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(DomainDeletion::Deleted {
            files_removed: files.rows_affected(),
        })
    }

    async fn domain_count(&self, user_id: UserId) -> StoreResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM domain_info WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }
}

#[async_trait]
impl FileRepo for PostgresStore {
    async fn list_domain_files(
        &self,
        user_id: UserId,
        domain_id: DomainId,
    ) -> StoreResult<Vec<FileRow>> {
        let rows = sqlx::query_as::<_, FileRow>(
            "SELECT * FROM file_info WHERE user_id = $1 AND domain_id = $2 ORDER BY file_upload_date, file_id",
        )
        .bind(user_id.as_uuid())
        .bind(domain_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_file(&self, file_id: FileId) -> StoreResult<Option<FileRow>> {
        let row = sqlx::query_as::<_, FileRow>("SELECT * FROM file_info WHERE file_id = $1")
            .bind(file_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_file(&self, file_id: FileId) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM file_content WHERE file_id = $1")
            .bind(file_id.as_uuid())
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM file_info WHERE file_id = $1")
            .bind(file_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn file_count(&self, user_id: UserId) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM file_info WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[async_trait]
impl ContentRepo for PostgresStore {
    async fn insert_file_batch(
        &self,
        user_id: UserId,
        files: &[FileRow],
        content: &[ContentRow],
    ) -> StoreResult<Admission> {
        validate_batch(user_id, files, content)?;

        let mut tx = self.pool.begin().await?;

        // Lock the owner row: concurrent commits for the same user
        // serialize here, so the count-and-insert below is race-free.
        let user_type: Option<String> =
            sqlx::query_scalar("SELECT user_type FROM user_info WHERE user_id = $1 FOR UPDATE")
                .bind(user_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        let Some(user_type) = user_type else {
            return Err(StoreError::NotFound(format!("user {user_id} not found")));
        };
        let tier = parse_tier(&user_type)?;

        let current: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM file_info WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_one(&mut *tx)
            .await?;

        let limit = tier.max_files();
        if current as u64 + files.len() as u64 > limit {
            tx.rollback().await?;
            return Ok(Admission::Denied(QuotaDenied {
                kind: QuotaKind::Files,
                current: current as u64,
                limit,
            }));
        }

        for file in files {
            sqlx::query(
                "INSERT INTO file_info (file_id, domain_id, user_id, file_name, file_modified_date, file_upload_date)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(file.file_id)
            .bind(file.domain_id)
            .bind(file.user_id)
            .bind(&file.file_name)
            .bind(file.file_modified_date)
            .bind(file.file_upload_date)
            .execute(&mut *tx)
            .await?;
        }

        for row in content {
            sqlx::query(
                "INSERT INTO file_content (file_id, position, sentence, page_number, is_header, is_table, embedding)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(row.file_id)
            .bind(row.position)
            .bind(&row.sentence)
            .bind(row.page_number)
            .bind(row.is_header)
            .bind(row.is_table)
            .bind(&row.embedding)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(
            user_id = %user_id,
            files = files.len(),
            content_rows = content.len(),
            "file batch committed"
        );
        Ok(Admission::Granted)
    }

    async fn read_content(&self, file_ids: &[FileId]) -> StoreResult<Option<DomainContent>> {
        if file_ids.is_empty() {
            return Ok(None);
        }

        let ids: Vec<Uuid> = file_ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query_as::<_, ContentReadRow>(
            "SELECT c.file_id, f.file_name, c.position, c.sentence, c.page_number, c.is_header, c.is_table, c.embedding
             FROM file_content c
             JOIN file_info f ON f.file_id = c.file_id
             WHERE c.file_id = ANY($1)
             ORDER BY c.file_id, c.position",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble_domain_content(rows, file_ids))
    }
}

#[async_trait]
impl SessionRepo for PostgresStore {
    async fn record_visit(&self, user_id: UserId, session_id: SessionId) -> StoreResult<()> {
        let now = OffsetDateTime::now_utc();
        sqlx::query(
            r#"
            INSERT INTO session_info (user_id, session_id, question_count, visit_count, created_at, last_seen_at)
            VALUES ($1, $2, 0, 1, $3, $3)
            ON CONFLICT (user_id, session_id) DO UPDATE SET
                visit_count = session_info.visit_count + 1,
                last_seen_at = EXCLUDED.last_seen_at
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(session_id.as_uuid())
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn admit_question(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> StoreResult<QuestionAdmission> {
        let now = OffsetDateTime::now_utc();
        let window_start = now - time::Duration::hours(24);

        // Lock the owner row for the duration of the check-and-increment.
        // Sessions are separate rows, so without this two requests through
        // different sessions could both pass the rolling-count predicate.
        let mut tx = self.pool.begin().await?;

        let user_type: Option<String> =
            sqlx::query_scalar("SELECT user_type FROM user_info WHERE user_id = $1 FOR UPDATE")
                .bind(user_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        let Some(user_type) = user_type else {
            return Err(StoreError::NotFound(format!("user {user_id} not found")));
        };
        let tier = parse_tier(&user_type)?;

        sqlx::query(
            r#"
            INSERT INTO session_info (user_id, session_id, question_count, visit_count, created_at, last_seen_at)
            VALUES ($1, $2, 0, 0, $3, $3)
            ON CONFLICT (user_id, session_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(session_id.as_uuid())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let updated: Option<i32> = match tier.daily_question_limit() {
            None => {
                sqlx::query_scalar(
                    r#"
                    UPDATE session_info
                    SET question_count = question_count + 1, last_seen_at = $3
                    WHERE user_id = $1 AND session_id = $2
                    RETURNING question_count
                    "#,
                )
                .bind(user_id.as_uuid())
                .bind(session_id.as_uuid())
                .bind(now)
                .fetch_optional(&mut *tx)
                .await?
            }
            Some(limit) => {
                // Check-and-increment as one conditional statement: no gap
                // between reading the rolling count and bumping the counter.
                sqlx::query_scalar(
                    r#"
                    UPDATE session_info
                    SET question_count = question_count + 1, last_seen_at = $3
                    WHERE user_id = $1 AND session_id = $2
                      AND (SELECT COALESCE(SUM(question_count), 0)
                           FROM session_info
                           WHERE user_id = $1 AND created_at >= $4) < $5
                    RETURNING question_count
                    "#,
                )
                .bind(user_id.as_uuid())
                .bind(session_id.as_uuid())
                .bind(now)
                .bind(window_start)
                .bind(limit as i64)
                .fetch_optional(&mut *tx)
                .await?
            }
        };

        match updated {
            Some(question_count) => {
                tx.commit().await?;
                Ok(QuestionAdmission::Granted {
                    question_count: question_count as u64,
                })
            }
            None => {
                let current: i64 = sqlx::query_scalar(
                    "SELECT COALESCE(SUM(question_count), 0)::BIGINT FROM session_info WHERE user_id = $1 AND created_at >= $2",
                )
                .bind(user_id.as_uuid())
                .bind(window_start)
                .fetch_one(&mut *tx)
                .await?;
                tx.commit().await?;

                let limit = tier.daily_question_limit().unwrap_or(u64::MAX);
                Ok(QuestionAdmission::Denied(QuotaDenied {
                    kind: QuotaKind::Questions,
                    current: current as u64,
                    limit,
                }))
            }
        }
    }

    async fn rolling_question_count(&self, user_id: UserId) -> StoreResult<u64> {
        let window_start = OffsetDateTime::now_utc() - time::Duration::hours(24);
        let count: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(question_count), 0)::BIGINT FROM session_info WHERE user_id = $1 AND created_at >= $2",
        )
        .bind(user_id.as_uuid())
        .bind(window_start)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn get_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> StoreResult<Option<SessionRow>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM session_info WHERE user_id = $1 AND session_id = $2",
        )
        .bind(user_id.as_uuid())
        .bind(session_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
