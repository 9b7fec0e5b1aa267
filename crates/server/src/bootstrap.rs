//! User provisioning.
//!
//! Every user must own at least one domain, and exactly one protected
//! default domain. Provisioning is idempotent: re-authentication
//! refreshes the profile and leaves existing domains alone. First-time
//! users get the default domain seeded with the embedded user guide so
//! their first question has something to land on.

use crate::error::{ApiError, ApiResult};
use doclink_core::{
    DomainId, DomainKind, ExtractedDocument, FileId, UserId, embedding,
};
use doclink_engine::{DocumentReader, EmbeddingEngine};
use doclink_sealer::ContentSealer;
use doclink_store::models::{ContentRow, DomainRow, FileRow};
use doclink_store::{ContentStore, UserProfile};
use time::OffsetDateTime;

/// Name given to every user's protected default domain.
pub const DEFAULT_DOMAIN_NAME: &str = "My Documents";

/// File name of the seeded guide.
pub const USER_GUIDE_NAME: &str = "User Guide.md";

/// The guide content shipped with the server.
const USER_GUIDE: &str = include_str!("user_guide.md");

/// Upsert the user and, on first sight, create the protected default
/// domain seeded with the user guide. Returns the default domain id for
/// fresh users.
pub async fn provision_user(
    store: &dyn ContentStore,
    sealer: &ContentSealer,
    reader: &dyn DocumentReader,
    embedder: &dyn EmbeddingEngine,
    profile: &UserProfile,
) -> ApiResult<Option<DomainId>> {
    store.upsert_user(profile).await?;

    if store.domain_count(profile.user_id).await? > 0 {
        return Ok(None);
    }

    let domain_id = DomainId::new();
    let now = OffsetDateTime::now_utc();
    let admission = store
        .create_domain(&DomainRow {
            domain_id: *domain_id.as_uuid(),
            user_id: *profile.user_id.as_uuid(),
            domain_name: DEFAULT_DOMAIN_NAME.to_string(),
            domain_type: DomainKind::Default.as_i16(),
            created_at: now,
            updated_at: now,
        })
        .await?;
    if !admission.is_granted() {
        // A user with zero domains is under every ceiling.
        return Err(ApiError::Internal(
            "default domain creation denied for a fresh user".to_string(),
        ));
    }

    seed_user_guide(store, sealer, reader, embedder, profile.user_id, domain_id).await?;
    tracing::info!(user_id = %profile.user_id, domain_id = %domain_id, "user provisioned");
    Ok(Some(domain_id))
}

/// Insert the embedded user guide into a domain through the normal
/// batch writer.
async fn seed_user_guide(
    store: &dyn ContentStore,
    sealer: &ContentSealer,
    reader: &dyn DocumentReader,
    embedder: &dyn EmbeddingEngine,
    user_id: UserId,
    domain_id: DomainId,
) -> ApiResult<()> {
    let extraction = reader.read(USER_GUIDE.as_bytes(), USER_GUIDE_NAME)?;
    let sentences: Vec<String> = extraction
        .units
        .iter()
        .map(|u| u.sentence.clone())
        .collect();
    let embeddings = embedder.embed(&sentences)?;
    let document = ExtractedDocument::new(USER_GUIDE_NAME, extraction.units, embeddings)
        .map_err(|e| ApiError::Internal(format!("embedded guide failed validation: {e}")))?;

    let file_id = FileId::new();
    let now = OffsetDateTime::now_utc();
    let file = FileRow {
        file_id: *file_id.as_uuid(),
        domain_id: *domain_id.as_uuid(),
        user_id: *user_id.as_uuid(),
        file_name: USER_GUIDE_NAME.to_string(),
        file_modified_date: now.date(),
        file_upload_date: now,
    };

    let (units, embeddings) = document.into_parts();
    let mut content = Vec::with_capacity(units.len());
    for (position, (unit, vector)) in units.iter().zip(&embeddings).enumerate() {
        content.push(ContentRow {
            file_id: *file_id.as_uuid(),
            position: position as i32,
            sentence: sealer.seal(&unit.sentence, file_id)?,
            page_number: unit.page_number,
            is_header: unit.is_header,
            is_table: unit.is_table,
            embedding: embedding::vec_to_blob(vector),
        });
    }

    let admission = store.insert_file_batch(user_id, &[file], &content).await?;
    if !admission.is_granted() {
        return Err(ApiError::Internal(
            "guide insertion denied for a fresh user".to_string(),
        ));
    }
    Ok(())
}
