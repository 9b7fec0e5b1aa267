//! The upload staging pipeline.
//!
//! Staging extracts and embeds a document, then parks it in the cache
//! under (user, file name) with a short fixed lifetime. Commit drains
//! the user's staged entries into one durable batch behind the quota
//! ledger, then republishes the working set through the orchestrator.
//!
//! Failure discipline, per contract:
//! - a quota denial removes nothing and writes nothing, so the user's
//!   staged work survives for a retry;
//! - a granted commit removes every consumed staging entry
//!   unconditionally — a retry re-uploads, it does not resume;
//! - a staged entry that is never committed expires silently.

use crate::activation::{ActivationError, ActivationState, DomainActivation};
use doclink_cache::{CacheError, WorkingSetCache};
use doclink_core::{ExtractedDocument, FileId, QuotaDenied, StagedUpload, UserId, embedding};
use doclink_engine::{DocumentReader, EmbeddingEngine, EngineError};
use doclink_sealer::{ContentSealer, SealerError};
use doclink_store::models::{ContentRow, FileRow};
use doclink_store::{ContentStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use time::{Date, OffsetDateTime};

/// Pipeline errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no domain selected")]
    NoDomainSelected,

    #[error("selected domain no longer exists")]
    UnknownDomain,

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("sealing error: {0}")]
    Sealer(#[from] SealerError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

impl From<ActivationError> for PipelineError {
    fn from(e: ActivationError) -> Self {
        match e {
            ActivationError::Store(e) => Self::Store(e),
            ActivationError::Cache(e) => Self::Cache(e),
        }
    }
}

/// Outcome of a commit.
#[derive(Debug)]
pub enum CommitOutcome {
    /// The batch landed; staging was drained and the working set
    /// republished.
    Committed {
        file_ids: Vec<FileId>,
        file_names: Vec<String>,
        state: ActivationState,
    },
    /// The quota ceiling was hit. Staging is intact; nothing durable
    /// happened.
    Rejected(QuotaDenied),
    /// There was nothing staged to commit.
    NothingStaged,
}

/// Extracts, stages, and commits uploads.
pub struct StagingPipeline {
    store: Arc<dyn ContentStore>,
    cache: Arc<dyn WorkingSetCache>,
    sealer: Arc<ContentSealer>,
    activation: Arc<DomainActivation>,
    reader: Arc<dyn DocumentReader>,
    embedder: Arc<dyn EmbeddingEngine>,
}

impl StagingPipeline {
    pub fn new(
        store: Arc<dyn ContentStore>,
        cache: Arc<dyn WorkingSetCache>,
        sealer: Arc<ContentSealer>,
        activation: Arc<DomainActivation>,
        reader: Arc<dyn DocumentReader>,
        embedder: Arc<dyn EmbeddingEngine>,
    ) -> Self {
        Self {
            store,
            cache,
            sealer,
            activation,
            reader,
            embedder,
        }
    }

    /// Extract and embed a document, then stage it for the user.
    ///
    /// Empty extraction is terminal: the caller reports it, nothing is
    /// staged, nothing is retried automatically.
    pub async fn stage_document(
        &self,
        user_id: UserId,
        file_name: &str,
        last_modified: Date,
        bytes: &[u8],
    ) -> Result<(), PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::Validation(format!(
                "empty upload: {file_name}"
            )));
        }

        let extraction = self.reader.read(bytes, file_name)?;
        let sentences: Vec<String> = extraction
            .units
            .iter()
            .map(|u| u.sentence.clone())
            .collect();
        let embeddings = self.embedder.embed(&sentences)?;
        let document = ExtractedDocument::new(file_name, extraction.units, embeddings)
            .map_err(|e| PipelineError::Validation(e.to_string()))?;

        self.cache
            .stage_upload(
                user_id,
                StagedUpload::from_document(file_name.to_string(), last_modified, document),
            )
            .await?;
        tracing::debug!(user_id = %user_id, file_name, "upload staged");
        Ok(())
    }

    /// Commit every staged entry for the user into the selected domain.
    pub async fn commit(&self, user_id: UserId) -> Result<CommitOutcome, PipelineError> {
        let Some(domain_id) = self.cache.selected_domain(user_id).await? else {
            return Err(PipelineError::NoDomainSelected);
        };
        if self
            .store
            .get_user_domain(user_id, domain_id)
            .await?
            .is_none()
        {
            return Err(PipelineError::UnknownDomain);
        }

        let staged = self.cache.staged_uploads(user_id).await?;
        if staged.is_empty() {
            return Ok(CommitOutcome::NothingStaged);
        }

        let now = OffsetDateTime::now_utc();
        let mut files = Vec::with_capacity(staged.len());
        let mut content = Vec::new();
        let mut file_ids = Vec::with_capacity(staged.len());
        let mut file_names = Vec::with_capacity(staged.len());

        for entry in &staged {
            let file_id = FileId::new();
            files.push(FileRow {
                file_id: *file_id.as_uuid(),
                domain_id: *domain_id.as_uuid(),
                user_id: *user_id.as_uuid(),
                file_name: entry.file_name.clone(),
                file_modified_date: entry.last_modified,
                file_upload_date: now,
            });
            for (position, (unit, vector)) in
                entry.units.iter().zip(&entry.embeddings).enumerate()
            {
                content.push(ContentRow {
                    file_id: *file_id.as_uuid(),
                    position: position as i32,
                    sentence: self.sealer.seal(&unit.sentence, file_id)?,
                    page_number: unit.page_number,
                    is_header: unit.is_header,
                    is_table: unit.is_table,
                    embedding: embedding::vec_to_blob(vector),
                });
            }
            file_ids.push(file_id);
            file_names.push(entry.file_name.clone());
        }

        match self.store.insert_file_batch(user_id, &files, &content).await? {
            doclink_core::Admission::Denied(denied) => {
                // Nothing durable happened and staging is untouched; the
                // caller can retry after adjusting the batch.
                tracing::info!(user_id = %user_id, %denied, "commit rejected by quota ledger");
                Ok(CommitOutcome::Rejected(denied))
            }
            doclink_core::Admission::Granted => {
                // Unconditional drain of every consumed entry.
                for name in &file_names {
                    self.cache.remove_staged(user_id, name).await?;
                }
                let state = self.activation.on_files_committed(user_id, domain_id).await?;
                Ok(CommitOutcome::Committed {
                    file_ids,
                    file_names,
                    state,
                })
            }
        }
    }
}
