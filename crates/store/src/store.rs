//! Content store trait and the SQLite implementation.

use crate::error::{StoreError, StoreResult};
use crate::models::{ContentRow, DomainRow, FileRow, SessionRow, UserRow};
use crate::repos::content::{ContentReadRow, assemble_domain_content};
use crate::repos::{
    ContentRepo, DomainContent, DomainOverview, DomainRepo, FileRepo, QuestionAdmission,
    SessionRepo, UserOverview, UserProfile, UserRepo,
};
use async_trait::async_trait;
use doclink_core::{
    Admission, DomainDeletion, DomainId, DomainKind, FileId, QuotaDenied, QuotaKind, SessionId,
    Tier, UserId,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;

/// SQLite schema (embedded).
const SQLITE_SCHEMA: &str = include_str!("sqlite_schema.sql");

/// Combined content store trait.
#[async_trait]
pub trait ContentStore:
    UserRepo + DomainRepo + FileRepo + ContentRepo + SessionRepo + Send + Sync
{
    /// Apply the schema.
    async fn migrate(&self) -> StoreResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> StoreResult<()>;
}

/// Split an embedded schema into individual statements.
pub(crate) fn schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                return None;
            }
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}

/// Parse a stored tier string, mapping corruption to an internal error.
pub(crate) fn parse_tier(raw: &str) -> StoreResult<Tier> {
    Tier::parse(raw).map_err(|e| StoreError::Internal(format!("corrupt user_type: {e}")))
}

/// SQLite-based content store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store.
    pub async fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Config(format!("cannot create {}: {e}", parent.display())))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))
            .map_err(StoreError::Database)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection
            // serializes quota check-and-write sequences the way row locks
            // do under PostgreSQL, and avoids "database is locked" failures.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl ContentStore for SqliteStore {
    async fn migrate(&self) -> StoreResult<()> {
        for statement in schema_statements(SQLITE_SCHEMA) {
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
impl UserRepo for SqliteStore {
    async fn upsert_user(&self, profile: &UserProfile) -> StoreResult<UserRow> {
        let now = OffsetDateTime::now_utc();
        sqlx::query(
            r#"
            INSERT INTO user_info (user_id, user_name, user_surname, user_email, user_type, picture_url, created_at)
            VALUES ($1, $2, $3, $4, 'free', $5, $6)
            ON CONFLICT (user_id) DO UPDATE SET
                user_name = excluded.user_name,
                user_surname = excluded.user_surname,
                user_email = excluded.user_email,
                picture_url = excluded.picture_url
            "#,
        )
        .bind(profile.user_id.as_uuid())
        .bind(&profile.user_name)
        .bind(&profile.user_surname)
        .bind(&profile.user_email)
        .bind(&profile.picture_url)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_user(profile.user_id).await?.ok_or_else(|| {
            StoreError::Internal(format!("user {} vanished after upsert", profile.user_id))
        })
    }

    async fn get_user(&self, user_id: UserId) -> StoreResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM user_info WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn set_tier(&self, user_id: UserId, tier: Tier) -> StoreResult<()> {
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
impl DomainRepo for SqliteStore {
    async fn create_domain(&self, domain: &DomainRow) -> StoreResult<Admission> {
        let mut tx = self.pool.begin().await?;

        let user_type: Option<String> =
            sqlx::query_scalar("SELECT user_type FROM user_info WHERE user_id = $1")
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

        let current: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM domain_info WHERE user_id = $1")
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

        let domain_type: Option<i16> =
            sqlx::query_scalar("SELECT domain_type FROM domain_info WHERE domain_id = $1")
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
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM domain_info WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[async_trait]
impl FileRepo for SqliteStore {
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

        // The schema cascades content on file deletion, but be explicit:
        // content first, then metadata.
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
impl ContentRepo for SqliteStore {
    async fn insert_file_batch(
        &self,
        user_id: UserId,
        files: &[FileRow],
        content: &[ContentRow],
    ) -> StoreResult<Admission> {
        crate::repos::content::validate_batch(user_id, files, content)?;

        let mut tx = self.pool.begin().await?;

        let user_type: Option<String> =
            sqlx::query_scalar("SELECT user_type FROM user_info WHERE user_id = $1")
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

        // SQLite has no array binding; expand placeholders.
        let placeholders = (1..=file_ids.len())
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT c.file_id, f.file_name, c.position, c.sentence, c.page_number, c.is_header, c.is_table, c.embedding
             FROM file_content c
             JOIN file_info f ON f.file_id = c.file_id
             WHERE c.file_id IN ({placeholders})
             ORDER BY c.file_id, c.position",
        );

        let mut query = sqlx::query_as::<_, ContentReadRow>(&sql);
        for file_id in file_ids {
            query = query.bind(file_id.as_uuid());
        }
        let rows = query.fetch_all(&self.pool).await?;

        Ok(assemble_domain_content(rows, file_ids))
    }
}

#[async_trait]
impl SessionRepo for SqliteStore {
    async fn record_visit(&self, user_id: UserId, session_id: SessionId) -> StoreResult<()> {
        let now = OffsetDateTime::now_utc();
        sqlx::query(
            r#"
            INSERT INTO session_info (user_id, session_id, question_count, visit_count, created_at, last_seen_at)
            VALUES ($1, $2, 0, 1, $3, $3)
            ON CONFLICT (user_id, session_id) DO UPDATE SET
                visit_count = visit_count + 1,
                last_seen_at = excluded.last_seen_at
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

        // The single pool connection serializes concurrent admissions, so
        // the tier read and the conditional increment below cannot
        // interleave with another request's increment.
        let mut tx = self.pool.begin().await?;

        let user_type: Option<String> =
            sqlx::query_scalar("SELECT user_type FROM user_info WHERE user_id = $1")
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
                    "SELECT COALESCE(SUM(question_count), 0) FROM session_info WHERE user_id = $1 AND created_at >= $2",
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
            "SELECT COALESCE(SUM(question_count), 0) FROM session_info WHERE user_id = $1 AND created_at >= $2",
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

/// Group a user's domains and files into an overview.
pub(crate) fn group_overview(
    user: UserRow,
    domains: Vec<DomainRow>,
    files: Vec<FileRow>,
    rolling_question_count: u64,
) -> UserOverview {
    let mut overview_domains: Vec<DomainOverview> = domains
        .into_iter()
        .map(|domain| DomainOverview {
            domain,
            files: Vec::new(),
        })
        .collect();
    for file in files {
        if let Some(entry) = overview_domains
            .iter_mut()
            .find(|d| d.domain.domain_id == file.domain_id)
        {
            entry.files.push(file);
        }
    }
    UserOverview {
        user,
        domains: overview_domains,
        rolling_question_count,
    }
}
