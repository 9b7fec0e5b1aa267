//! In-process cache backend.
//!
//! Three `moka` caches back the trait:
//! - selections and working sets use a time-to-idle policy, so any
//!   activity on the user's behalf restarts their lifetime;
//! - staged uploads use a fixed time-to-live, after which an
//!   uncommitted upload is silently gone.
//!
//! Expired entries are dropped lazily by moka on access; `maintain()`
//! forces the pending housekeeping and is wired to a background task in
//! the server binary.

use crate::error::CacheResult;
use crate::traits::WorkingSetCache;
use async_trait::async_trait;
use doclink_core::config::CacheConfig;
use doclink_core::{DomainId, StagedUpload, UserId, WorkingSet};
use std::sync::Arc;
use std::time::Duration;

/// In-process TTL-bound cache.
pub struct MemoryCache {
    selected: moka::sync::Cache<UserId, DomainId>,
    working: moka::sync::Cache<UserId, Arc<WorkingSet>>,
    staging: moka::sync::Cache<(UserId, String), Arc<StagedUpload>>,
}

impl MemoryCache {
    /// Create a cache from configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_ttls(
            config.staging_ttl(),
            config.working_set_idle(),
            config.max_resident_users,
        )
    }

    /// Create a cache with explicit lifetimes. Used directly by tests
    /// that need sub-second expiry.
    pub fn with_ttls(staging_ttl: Duration, working_set_idle: Duration, max_users: u64) -> Self {
        let selected = moka::sync::Cache::builder()
            .max_capacity(max_users)
            .time_to_idle(working_set_idle)
            .build();

        let working = moka::sync::Cache::builder()
            .max_capacity(max_users)
            .time_to_idle(working_set_idle)
            .eviction_listener(|key: Arc<UserId>, _value, cause| {
                if cause == moka::notification::RemovalCause::Size {
                    tracing::debug!(user_id = %key, "working set evicted under memory pressure");
                }
            })
            .build();

        // Staged uploads are small relative to working sets; a generous
        // multiple keeps eviction from racing the commit path.
        let staging = moka::sync::Cache::builder()
            .max_capacity(max_users.saturating_mul(8))
            .time_to_live(staging_ttl)
            .build();

        Self {
            selected,
            working,
            staging,
        }
    }

    /// Run pending cache housekeeping (expiry sweeps, evictions).
    pub fn maintain(&self) {
        self.selected.run_pending_tasks();
        self.working.run_pending_tasks();
        self.staging.run_pending_tasks();
    }
}

#[async_trait]
impl WorkingSetCache for MemoryCache {
    async fn set_selected_domain(&self, user_id: UserId, domain_id: DomainId) -> CacheResult<()> {
        self.selected.insert(user_id, domain_id);
        Ok(())
    }

    async fn selected_domain(&self, user_id: UserId) -> CacheResult<Option<DomainId>> {
        Ok(self.selected.get(&user_id))
    }

    async fn clear_selected_domain(&self, user_id: UserId) -> CacheResult<()> {
        self.selected.invalidate(&user_id);
        Ok(())
    }

    async fn publish_working_set(
        &self,
        user_id: UserId,
        working_set: WorkingSet,
    ) -> CacheResult<()> {
        self.working.insert(user_id, Arc::new(working_set));
        Ok(())
    }

    async fn working_set(&self, user_id: UserId) -> CacheResult<Option<Arc<WorkingSet>>> {
        Ok(self.working.get(&user_id))
    }

    async fn invalidate_working_set(&self, user_id: UserId) -> CacheResult<()> {
        self.working.invalidate(&user_id);
        Ok(())
    }

    async fn stage_upload(&self, user_id: UserId, staged: StagedUpload) -> CacheResult<()> {
        self.staging
            .insert((user_id, staged.file_name.clone()), Arc::new(staged));
        Ok(())
    }

    async fn staged_uploads(&self, user_id: UserId) -> CacheResult<Vec<Arc<StagedUpload>>> {
        let mut entries: Vec<Arc<StagedUpload>> = self
            .staging
            .iter()
            .filter(|(key, _)| key.0 == user_id)
            .map(|(_, value)| value)
            .collect();
        entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(entries)
    }

    async fn remove_staged(&self, user_id: UserId, file_name: &str) -> CacheResult<()> {
        self.staging.invalidate(&(user_id, file_name.to_string()));
        Ok(())
    }

    async fn refresh_user_ttl(&self, user_id: UserId) -> CacheResult<()> {
        // Time-to-idle restarts on read; a get is the refresh.
        let _ = self.selected.get(&user_id);
        let _ = self.working.get(&user_id);
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doclink_core::working_set::WorkingSetFile;
    use doclink_core::{ContentUnit, FileId};
    use time::macros::date;

    fn cache() -> MemoryCache {
        MemoryCache::with_ttls(Duration::from_secs(3600), Duration::from_secs(3600), 100)
    }

    fn staged(name: &str) -> StagedUpload {
        StagedUpload {
            file_name: name.to_string(),
            last_modified: date!(2025 - 01 - 15),
            units: vec![ContentUnit {
                sentence: "hello".to_string(),
                page_number: 1,
                is_header: false,
                is_table: false,
            }],
            embeddings: vec![vec![0.0; 4]],
        }
    }

    fn working_set() -> WorkingSet {
        let file_id = FileId::new();
        WorkingSet::new(
            DomainId::new(),
            vec![WorkingSetFile {
                file_id,
                file_name: "doc.txt".to_string(),
            }],
            vec![],
            vec![],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_selection_roundtrip() {
        let cache = cache();
        let user = UserId::new();
        let domain = DomainId::new();

        assert!(cache.selected_domain(user).await.unwrap().is_none());
        cache.set_selected_domain(user, domain).await.unwrap();
        assert_eq!(cache.selected_domain(user).await.unwrap(), Some(domain));
        cache.clear_selected_domain(user).await.unwrap();
        assert!(cache.selected_domain(user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_working_set_publish_and_invalidate() {
        let cache = cache();
        let user = UserId::new();

        cache.publish_working_set(user, working_set()).await.unwrap();
        assert!(cache.working_set(user).await.unwrap().is_some());

        cache.invalidate_working_set(user).await.unwrap();
        assert!(cache.working_set(user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_working_sets_are_per_user() {
        let cache = cache();
        let alice = UserId::new();
        let bob = UserId::new();

        cache.publish_working_set(alice, working_set()).await.unwrap();
        assert!(cache.working_set(bob).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_staging_enumeration_is_per_user_and_ordered() {
        let cache = cache();
        let alice = UserId::new();
        let bob = UserId::new();

        cache.stage_upload(alice, staged("b.txt")).await.unwrap();
        cache.stage_upload(alice, staged("a.txt")).await.unwrap();
        cache.stage_upload(bob, staged("c.txt")).await.unwrap();

        let names: Vec<_> = cache
            .staged_uploads(alice)
            .await
            .unwrap()
            .iter()
            .map(|s| s.file_name.clone())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_restaging_replaces_entry() {
        let cache = cache();
        let user = UserId::new();

        cache.stage_upload(user, staged("doc.txt")).await.unwrap();
        let mut replacement = staged("doc.txt");
        replacement.units[0].sentence = "replaced".to_string();
        cache.stage_upload(user, replacement).await.unwrap();

        let entries = cache.staged_uploads(user).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].units[0].sentence, "replaced");
    }

    #[tokio::test]
    async fn test_staging_expires() {
        let cache = MemoryCache::with_ttls(
            Duration::from_millis(50),
            Duration::from_secs(3600),
            100,
        );
        let user = UserId::new();

        cache.stage_upload(user, staged("doc.txt")).await.unwrap();
        assert_eq!(cache.staged_uploads(user).await.unwrap().len(), 1);

        tokio::time::sleep(Duration::from_millis(120)).await;
        cache.maintain();
        assert!(cache.staged_uploads(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_working_set_idles_out() {
        let cache = MemoryCache::with_ttls(
            Duration::from_secs(3600),
            Duration::from_millis(50),
            100,
        );
        let user = UserId::new();

        cache.publish_working_set(user, working_set()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        cache.maintain();
        assert!(cache.working_set(user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_keeps_working_set_alive() {
        let cache = MemoryCache::with_ttls(
            Duration::from_secs(3600),
            Duration::from_millis(200),
            100,
        );
        let user = UserId::new();

        cache.publish_working_set(user, working_set()).await.unwrap();
        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(80)).await;
            cache.refresh_user_ttl(user).await.unwrap();
        }
        // Total elapsed exceeds the idle window, but refreshes kept it live.
        assert!(cache.working_set(user).await.unwrap().is_some());
    }
}
