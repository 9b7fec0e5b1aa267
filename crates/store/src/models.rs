//! Database models mapping to the relational schema.

use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

// =============================================================================
// Users
// =============================================================================

/// User record. `user_type` is the stored tier string.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub user_name: String,
    pub user_surname: Option<String>,
    pub user_email: String,
    pub user_type: String,
    pub picture_url: Option<String>,
    pub created_at: OffsetDateTime,
}

// =============================================================================
// Domains
// =============================================================================

/// Domain record. `domain_type` 0 is the protected default domain.
#[derive(Debug, Clone, FromRow)]
pub struct DomainRow {
    pub domain_id: Uuid,
    pub user_id: Uuid,
    pub domain_name: String,
    pub domain_type: i16,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

// =============================================================================
// Files and content
// =============================================================================

/// File metadata record.
#[derive(Debug, Clone, FromRow)]
pub struct FileRow {
    pub file_id: Uuid,
    pub domain_id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub file_modified_date: Date,
    pub file_upload_date: OffsetDateTime,
}

/// One sealed content unit. `position` preserves source order within the
/// file; `sentence` is the AEAD envelope, `embedding` a little-endian
/// f32 blob.
#[derive(Debug, Clone, FromRow)]
pub struct ContentRow {
    pub file_id: Uuid,
    pub position: i32,
    pub sentence: Vec<u8>,
    pub page_number: i32,
    pub is_header: bool,
    pub is_table: bool,
    pub embedding: Vec<u8>,
}

/// A content unit joined with its file name, as read back for working-set
/// assembly. Embeddings travel separately as an aligned matrix.
#[derive(Debug, Clone, FromRow)]
pub struct ContentUnitRow {
    pub file_id: Uuid,
    pub file_name: String,
    pub position: i32,
    pub sentence: Vec<u8>,
    pub page_number: i32,
    pub is_header: bool,
    pub is_table: bool,
}

// =============================================================================
// Sessions
// =============================================================================

/// Question-counting session record. The rolling 24-hour quota sums
/// `question_count` over a user's recently created sessions; there is no
/// explicit daily reset.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub question_count: i32,
    pub visit_count: i32,
    pub created_at: OffsetDateTime,
    pub last_seen_at: OffsetDateTime,
}
