//! The domain activation orchestrator.
//!
//! This is the only component that publishes or invalidates working
//! sets. Every code path that changes domain membership — upload
//! commit, file removal, domain deletion, domain switch — funnels
//! through here, so the membership invariant cannot be bypassed by a
//! new mutation path: at no observable instant does a published working
//! set contain content for a file outside the selected domain, or omit
//! content for a file inside it.
//!
//! The orchestrator always recomputes from one full store read rather
//! than patching incrementally. That costs an O(files-in-domain) read
//! per membership change and buys the invariant by construction.

use doclink_cache::{CacheError, WorkingSetCache};
use doclink_core::working_set::{WorkingSetFile, WorkingSetUnit};
use doclink_core::{DomainId, FileId, UserId, WorkingSet};
use doclink_sealer::ContentSealer;
use doclink_store::{ContentStore, StoreError};
use std::sync::Arc;
use thiserror::Error;

/// Orchestrator errors: transport failures of the two shared stores.
/// Consistency misses are not errors; they resolve to [`ActivationState::DomainEmpty`].
#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Per-user activation state after an orchestrator operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivationState {
    /// No domain is selected; nothing is published.
    NoDomainSelected,
    /// The selected domain's working set is published.
    DomainActive(DomainId),
    /// A domain is selected but nothing is published (no files, or the
    /// read missed).
    DomainEmpty(DomainId),
}

/// Recomputes and republishes working sets on membership changes.
pub struct DomainActivation {
    store: Arc<dyn ContentStore>,
    cache: Arc<dyn WorkingSetCache>,
    sealer: Arc<ContentSealer>,
}

impl DomainActivation {
    pub fn new(
        store: Arc<dyn ContentStore>,
        cache: Arc<dyn WorkingSetCache>,
        sealer: Arc<ContentSealer>,
    ) -> Self {
        Self {
            store,
            cache,
            sealer,
        }
    }

    /// Select a domain and publish a working set assembled from one full
    /// store read, or invalidate if the domain is empty or the read
    /// missed. Never publishes from a partial read.
    pub async fn select_domain(
        &self,
        user_id: UserId,
        domain_id: DomainId,
    ) -> Result<ActivationState, ActivationError> {
        self.cache.set_selected_domain(user_id, domain_id).await?;

        let files = self.store.list_domain_files(user_id, domain_id).await?;
        if files.is_empty() {
            self.cache.invalidate_working_set(user_id).await?;
            return Ok(ActivationState::DomainEmpty(domain_id));
        }

        let file_ids: Vec<FileId> = files.iter().map(|f| FileId::from(f.file_id)).collect();
        let Some(content) = self.store.read_content(&file_ids).await? else {
            // Store inconsistency between membership and content. Resolved
            // by invalidation, never surfaced as an error.
            tracing::warn!(
                user_id = %user_id,
                domain_id = %domain_id,
                files = files.len(),
                "content read missed for a non-empty domain; invalidating working set"
            );
            self.cache.invalidate_working_set(user_id).await?;
            return Ok(ActivationState::DomainEmpty(domain_id));
        };

        let mut units = Vec::with_capacity(content.rows.len());
        for row in &content.rows {
            let file_id = FileId::from(row.file_id);
            match self.sealer.open(&row.sentence, file_id) {
                Ok(sentence) => units.push(WorkingSetUnit {
                    file_id,
                    file_name: row.file_name.clone(),
                    sentence,
                    page_number: row.page_number,
                    is_header: row.is_header,
                    is_table: row.is_table,
                }),
                Err(e) => {
                    tracing::warn!(
                        user_id = %user_id,
                        domain_id = %domain_id,
                        file_id = %file_id,
                        position = row.position,
                        error = %e,
                        "unsealing failed; invalidating working set"
                    );
                    self.cache.invalidate_working_set(user_id).await?;
                    return Ok(ActivationState::DomainEmpty(domain_id));
                }
            }
        }

        let members = files
            .iter()
            .map(|f| WorkingSetFile {
                file_id: FileId::from(f.file_id),
                file_name: f.file_name.clone(),
            })
            .collect();
        let working_set = match WorkingSet::new(domain_id, members, units, content.embeddings) {
            Ok(working_set) => working_set,
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    domain_id = %domain_id,
                    error = %e,
                    "assembled working set failed validation; invalidating"
                );
                self.cache.invalidate_working_set(user_id).await?;
                return Ok(ActivationState::DomainEmpty(domain_id));
            }
        };

        self.cache.publish_working_set(user_id, working_set).await?;
        tracing::debug!(
            user_id = %user_id,
            domain_id = %domain_id,
            files = files.len(),
            "working set published"
        );
        Ok(ActivationState::DomainActive(domain_id))
    }

    /// Republish after an upload commit made new files visible.
    pub async fn on_files_committed(
        &self,
        user_id: UserId,
        domain_id: DomainId,
    ) -> Result<ActivationState, ActivationError> {
        self.refresh(user_id, domain_id).await
    }

    /// Republish after a file was removed from the domain.
    pub async fn on_file_removed(
        &self,
        user_id: UserId,
        domain_id: DomainId,
    ) -> Result<ActivationState, ActivationError> {
        self.refresh(user_id, domain_id).await
    }

    /// React to a domain deletion: if it was the user's selection, drop
    /// the selection and the working set.
    pub async fn on_domain_deleted(
        &self,
        user_id: UserId,
        domain_id: DomainId,
    ) -> Result<(), ActivationError> {
        if self.cache.selected_domain(user_id).await? == Some(domain_id) {
            self.cache.clear_selected_domain(user_id).await?;
            self.cache.invalidate_working_set(user_id).await?;
        }
        Ok(())
    }

    /// Cache-miss recovery for the answer path: if a selection exists
    /// but its working set expired, recompute it.
    pub async fn recover(
        &self,
        user_id: UserId,
    ) -> Result<Option<Arc<WorkingSet>>, ActivationError> {
        if let Some(working_set) = self.cache.working_set(user_id).await? {
            return Ok(Some(working_set));
        }
        let Some(domain_id) = self.cache.selected_domain(user_id).await? else {
            return Ok(None);
        };
        match self.select_domain(user_id, domain_id).await? {
            ActivationState::DomainActive(_) => Ok(self.cache.working_set(user_id).await?),
            _ => Ok(None),
        }
    }

    async fn refresh(
        &self,
        user_id: UserId,
        domain_id: DomainId,
    ) -> Result<ActivationState, ActivationError> {
        if self
            .store
            .get_user_domain(user_id, domain_id)
            .await?
            .is_none()
        {
            // The membership change removed the domain itself.
            self.cache.clear_selected_domain(user_id).await?;
            self.cache.invalidate_working_set(user_id).await?;
            return Ok(ActivationState::NoDomainSelected);
        }
        self.select_domain(user_id, domain_id).await
    }
}
