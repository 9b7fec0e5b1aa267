//! File repository.

use crate::error::StoreResult;
use crate::models::FileRow;
use async_trait::async_trait;
use doclink_core::{DomainId, FileId, UserId};

/// Repository for file metadata operations.
#[async_trait]
pub trait FileRepo: Send + Sync {
    /// List the files assigned to a user's domain, oldest upload first.
    async fn list_domain_files(
        &self,
        user_id: UserId,
        domain_id: DomainId,
    ) -> StoreResult<Vec<FileRow>>;

    /// Get a file by id.
    async fn get_file(&self, file_id: FileId) -> StoreResult<Option<FileRow>>;

    /// Delete a file and its content rows in one transaction. Returns
    /// false if no such file.
    async fn delete_file(&self, file_id: FileId) -> StoreResult<bool>;

    /// Total files the user holds, across all domains.
    async fn file_count(&self, user_id: UserId) -> StoreResult<u64>;
}
