//! Cache trait definitions.

use crate::error::CacheResult;
use async_trait::async_trait;
use doclink_core::{DomainId, StagedUpload, UserId, WorkingSet};
use std::sync::Arc;

/// The working-set and staging cache.
///
/// Entries are exclusively owned by the keyed user; there is no
/// cross-user sharing and therefore no cross-user locking. Working sets
/// and selections carry an idle-refreshed lifetime; staged uploads carry
/// a fixed lifetime.
#[async_trait]
pub trait WorkingSetCache: Send + Sync {
    // --- Domain selection ---

    /// Record the user's selected domain.
    async fn set_selected_domain(&self, user_id: UserId, domain_id: DomainId) -> CacheResult<()>;

    /// The user's selected domain, if any selection is still live.
    async fn selected_domain(&self, user_id: UserId) -> CacheResult<Option<DomainId>>;

    /// Drop the user's selection (e.g., after their selected domain was
    /// deleted).
    async fn clear_selected_domain(&self, user_id: UserId) -> CacheResult<()>;

    // --- Working sets ---

    /// Publish a freshly assembled working set, replacing any previous one.
    async fn publish_working_set(&self, user_id: UserId, working_set: WorkingSet)
    -> CacheResult<()>;

    /// The user's current working set, if resident.
    async fn working_set(&self, user_id: UserId) -> CacheResult<Option<Arc<WorkingSet>>>;

    /// Remove the user's working set and any derived artifacts.
    async fn invalidate_working_set(&self, user_id: UserId) -> CacheResult<()>;

    // --- Upload staging ---

    /// Stage an upload under (user, file name). Re-staging the same name
    /// replaces the previous entry; the fixed TTL restarts.
    async fn stage_upload(&self, user_id: UserId, staged: StagedUpload) -> CacheResult<()>;

    /// All live staged uploads for the user, ordered by file name.
    async fn staged_uploads(&self, user_id: UserId) -> CacheResult<Vec<Arc<StagedUpload>>>;

    /// Remove one staged upload.
    async fn remove_staged(&self, user_id: UserId, file_name: &str) -> CacheResult<()>;

    // --- Lifetime management ---

    /// Refresh the idle clock on the user's selection and working set.
    async fn refresh_user_ttl(&self, user_id: UserId) -> CacheResult<()>;

    /// Check cache availability.
    async fn health_check(&self) -> CacheResult<()>;
}
