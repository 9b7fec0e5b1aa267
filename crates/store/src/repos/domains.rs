//! Domain repository.

use crate::error::StoreResult;
use crate::models::DomainRow;
use async_trait::async_trait;
use doclink_core::{Admission, DomainDeletion, DomainId, UserId};
use time::OffsetDateTime;

/// Repository for domain operations.
#[async_trait]
pub trait DomainRepo: Send + Sync {
    /// Create a domain. The domain-count admission check runs inside the
    /// same transaction as the insert, so concurrent creations cannot
    /// jointly exceed the tier ceiling.
    async fn create_domain(&self, domain: &DomainRow) -> StoreResult<Admission>;

    /// Get a domain by id.
    async fn get_domain(&self, domain_id: DomainId) -> StoreResult<Option<DomainRow>>;

    /// Get a domain by id, scoped to its owner.
    async fn get_user_domain(
        &self,
        user_id: UserId,
        domain_id: DomainId,
    ) -> StoreResult<Option<DomainRow>>;

    /// List a user's domains, oldest first.
    async fn list_user_domains(&self, user_id: UserId) -> StoreResult<Vec<DomainRow>>;

    /// Rename a domain. Returns false if no such domain.
    async fn rename_domain(
        &self,
        domain_id: DomainId,
        new_name: &str,
        updated_at: OffsetDateTime,
    ) -> StoreResult<bool>;

    /// Delete a domain with its files and content. The protected default
    /// domain is left untouched; callers must branch on all three
    /// outcomes.
    async fn delete_domain(&self, domain_id: DomainId) -> StoreResult<DomainDeletion>;

    /// Number of domains the user owns.
    async fn domain_count(&self, user_id: UserId) -> StoreResult<u64>;
}
