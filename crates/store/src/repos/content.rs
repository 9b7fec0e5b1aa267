//! Content repository: durable batch writes and working-set reads.

use crate::error::{StoreError, StoreResult};
use crate::models::{ContentRow, ContentUnitRow, FileRow};
use async_trait::async_trait;
use doclink_core::{Admission, FileId, UserId, embedding};
use sqlx::FromRow;
use std::collections::HashSet;
use uuid::Uuid;

/// The assembled content of a set of files: rows ordered by
/// `(file_id, position)` and an embedding matrix aligned row-for-row.
#[derive(Debug, Clone)]
pub struct DomainContent {
    pub rows: Vec<ContentUnitRow>,
    pub embeddings: Vec<Vec<f32>>,
}

/// Repository for durable content operations.
#[async_trait]
pub trait ContentRepo: Send + Sync {
    /// Insert a batch of files with their content rows in one
    /// transaction, together with the file-count admission check.
    ///
    /// Either everything lands (metadata and content for every file in
    /// the batch) or nothing does — partial insertion is never
    /// observable, including on statement timeout. A denial rolls back
    /// without writing.
    async fn insert_file_batch(
        &self,
        user_id: UserId,
        files: &[FileRow],
        content: &[ContentRow],
    ) -> StoreResult<Admission>;

    /// Read the content and embeddings for a set of files.
    ///
    /// Returns `None` — a full miss, never a partial result — when any
    /// requested file has no content rows or any embedding blob fails to
    /// decode. Callers treat a miss as a consistency event and
    /// invalidate, not as an error.
    async fn read_content(&self, file_ids: &[FileId]) -> StoreResult<Option<DomainContent>>;
}

/// One joined content row as fetched by `read_content`, embedding
/// included. Backend-shared; both implementations decode through
/// [`assemble_domain_content`].
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ContentReadRow {
    pub file_id: Uuid,
    pub file_name: String,
    pub position: i32,
    pub sentence: Vec<u8>,
    pub page_number: i32,
    pub is_header: bool,
    pub is_table: bool,
    pub embedding: Vec<u8>,
}

/// Cheap structural validation of a write batch, shared by both backends.
pub(crate) fn validate_batch(
    user_id: UserId,
    files: &[FileRow],
    content: &[ContentRow],
) -> StoreResult<()> {
    if files.is_empty() {
        return Err(StoreError::InvalidBatch("no files in batch".to_string()));
    }
    if files.len() > doclink_core::MAX_FILES_PER_COMMIT {
        return Err(StoreError::InvalidBatch(format!(
            "batch carries {} files, maximum is {}",
            files.len(),
            doclink_core::MAX_FILES_PER_COMMIT
        )));
    }
    let file_ids: HashSet<Uuid> = files.iter().map(|f| f.file_id).collect();
    if file_ids.len() != files.len() {
        return Err(StoreError::InvalidBatch(
            "duplicate file ids in batch".to_string(),
        ));
    }
    for file in files {
        if file.user_id != *user_id.as_uuid() {
            return Err(StoreError::InvalidBatch(format!(
                "file {} does not belong to user {user_id}",
                file.file_id
            )));
        }
    }
    for row in content {
        if !file_ids.contains(&row.file_id) {
            return Err(StoreError::InvalidBatch(format!(
                "content row references file {} outside the batch",
                row.file_id
            )));
        }
    }
    Ok(())
}

/// Turn fetched rows into a [`DomainContent`], enforcing full-miss
/// semantics: every requested file must have rows and every embedding
/// must decode at the fixed width, or the whole read reports `None`.
pub(crate) fn assemble_domain_content(
    rows: Vec<ContentReadRow>,
    requested: &[FileId],
) -> Option<DomainContent> {
    if rows.is_empty() {
        return None;
    }

    let present: HashSet<Uuid> = rows.iter().map(|r| r.file_id).collect();
    for file_id in requested {
        if !present.contains(file_id.as_uuid()) {
            tracing::warn!(
                file_id = %file_id,
                "requested file has no content rows; treating read as a full miss"
            );
            return None;
        }
    }

    let mut out_rows = Vec::with_capacity(rows.len());
    let mut embeddings = Vec::with_capacity(rows.len());
    for row in rows {
        match embedding::blob_to_vec(&row.embedding, doclink_core::EMBEDDING_DIM) {
            Ok(vector) => embeddings.push(vector),
            Err(e) => {
                tracing::warn!(
                    file_id = %row.file_id,
                    position = row.position,
                    error = %e,
                    "undecodable embedding; treating read as a full miss"
                );
                return None;
            }
        }
        out_rows.push(ContentUnitRow {
            file_id: row.file_id,
            file_name: row.file_name,
            position: row.position,
            sentence: row.sentence,
            page_number: row.page_number,
            is_header: row.is_header,
            is_table: row.is_table,
        });
    }

    Some(DomainContent {
        rows: out_rows,
        embeddings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use time::macros::date;

    fn file_row(user_id: UserId) -> FileRow {
        FileRow {
            file_id: Uuid::new_v4(),
            domain_id: Uuid::new_v4(),
            user_id: *user_id.as_uuid(),
            file_name: "doc.txt".to_string(),
            file_modified_date: date!(2025 - 01 - 15),
            file_upload_date: OffsetDateTime::now_utc(),
        }
    }

    fn read_row(file_id: Uuid, position: i32, embedding: Vec<u8>) -> ContentReadRow {
        ContentReadRow {
            file_id,
            file_name: "doc.txt".to_string(),
            position,
            sentence: vec![1, 2, 3],
            page_number: 1,
            is_header: false,
            is_table: false,
            embedding,
        }
    }

    #[test]
    fn test_validate_rejects_foreign_content() {
        let user = UserId::new();
        let file = file_row(user);
        let content = ContentRow {
            file_id: Uuid::new_v4(),
            position: 0,
            sentence: vec![],
            page_number: 1,
            is_header: false,
            is_table: false,
            embedding: vec![],
        };
        let err = validate_batch(user, &[file], &[content]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidBatch(_)));
    }

    #[test]
    fn test_validate_rejects_empty_and_duplicates() {
        let user = UserId::new();
        assert!(validate_batch(user, &[], &[]).is_err());

        let file = file_row(user);
        let dup = file.clone();
        assert!(validate_batch(user, &[file, dup], &[]).is_err());
    }

    #[test]
    fn test_assemble_full_miss_on_absent_file() {
        let present = FileId::new();
        let absent = FileId::new();
        let blob = embedding::vec_to_blob(&vec![0.0; doclink_core::EMBEDDING_DIM]);
        let rows = vec![read_row(*present.as_uuid(), 0, blob)];
        assert!(assemble_domain_content(rows, &[present, absent]).is_none());
    }

    #[test]
    fn test_assemble_full_miss_on_bad_embedding() {
        let file = FileId::new();
        let rows = vec![read_row(*file.as_uuid(), 0, vec![0u8; 7])];
        assert!(assemble_domain_content(rows, &[file]).is_none());
    }

    #[test]
    fn test_assemble_aligns_rows_and_embeddings() {
        let file = FileId::new();
        let blob = embedding::vec_to_blob(&vec![0.5; doclink_core::EMBEDDING_DIM]);
        let rows = vec![
            read_row(*file.as_uuid(), 0, blob.clone()),
            read_row(*file.as_uuid(), 1, blob),
        ];
        let content = assemble_domain_content(rows, &[file]).unwrap();
        assert_eq!(content.rows.len(), 2);
        assert_eq!(content.embeddings.len(), 2);
        assert_eq!(content.embeddings[0].len(), doclink_core::EMBEDDING_DIM);
    }
}
