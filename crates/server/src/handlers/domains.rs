//! Domain management handlers.
//!
//! Every membership-changing operation here reports to the activation
//! orchestrator; none touches the working-set cache directly.

use crate::error::{ApiError, ApiResult};
use crate::handlers::UserQuery;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use doclink_core::{Admission, DomainDeletion, DomainId, DomainKind, UserId};
use doclink_store::models::DomainRow;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Deserialize)]
pub struct CreateDomainRequest {
    pub domain_name: String,
}

#[derive(Serialize)]
pub struct CreateDomainResponse {
    pub domain_id: DomainId,
}

/// POST /v1/domains - Create a user domain behind the domain-count
/// ledger check.
pub async fn create_domain(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
    Json(body): Json<CreateDomainRequest>,
) -> ApiResult<Json<CreateDomainResponse>> {
    let name = body.domain_name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("domain name cannot be empty".to_string()));
    }

    let domain_id = DomainId::new();
    let now = OffsetDateTime::now_utc();
    let admission = state
        .store
        .create_domain(&DomainRow {
            domain_id: *domain_id.as_uuid(),
            user_id: *query.user_id.as_uuid(),
            domain_name: name.to_string(),
            domain_type: DomainKind::UserCreated.as_i16(),
            created_at: now,
            updated_at: now,
        })
        .await?;

    match admission {
        Admission::Granted => Ok(Json(CreateDomainResponse { domain_id })),
        Admission::Denied(denied) => Err(ApiError::QuotaExceeded(denied)),
    }
}

#[derive(Debug, Deserialize)]
pub struct RenameDomainRequest {
    pub new_name: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// POST /v1/domains/{domain_id}/rename - Rename an owned domain.
pub async fn rename_domain(
    State(state): State<AppState>,
    Path(domain_id): Path<DomainId>,
    Query(query): Query<UserQuery>,
    Json(body): Json<RenameDomainRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let name = body.new_name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("domain name cannot be empty".to_string()));
    }

    require_owned(&state, query.user_id, domain_id).await?;
    let renamed = state
        .store
        .rename_domain(domain_id, name, OffsetDateTime::now_utc())
        .await?;
    if !renamed {
        return Err(ApiError::NotFound(format!("domain {domain_id} not found")));
    }
    Ok(Json(MessageResponse { message: "success" }))
}

#[derive(Serialize)]
pub struct DeleteDomainResponse {
    pub message: &'static str,
    pub files_removed: u64,
}

/// DELETE /v1/domains/{domain_id} - Delete an owned domain with its
/// files and content. The protected default domain is refused.
pub async fn delete_domain(
    State(state): State<AppState>,
    Path(domain_id): Path<DomainId>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<DeleteDomainResponse>> {
    require_owned(&state, query.user_id, domain_id).await?;

    match state.store.delete_domain(domain_id).await? {
        DomainDeletion::Protected => Err(ApiError::BadRequest(
            "this is your default domain; it cannot be deleted, only emptied".to_string(),
        )),
        DomainDeletion::NotFound => {
            Err(ApiError::NotFound(format!("domain {domain_id} not found")))
        }
        DomainDeletion::Deleted { files_removed } => {
            state
                .activation
                .on_domain_deleted(query.user_id, domain_id)
                .await?;
            Ok(Json(DeleteDomainResponse {
                message: "success",
                files_removed,
            }))
        }
    }
}

#[derive(Serialize)]
pub struct SelectDomainResponse {
    pub state: &'static str,
    pub file_ids: Vec<uuid::Uuid>,
    pub file_names: Vec<String>,
}

/// POST /v1/domains/{domain_id}/select - Make a domain the active
/// question-answering scope and publish its working set.
pub async fn select_domain(
    State(state): State<AppState>,
    Path(domain_id): Path<DomainId>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<SelectDomainResponse>> {
    require_owned(&state, query.user_id, domain_id).await?;

    let activation_state = state
        .activation
        .select_domain(query.user_id, domain_id)
        .await?;
    state.cache.refresh_user_ttl(query.user_id).await?;

    let files = state
        .store
        .list_domain_files(query.user_id, domain_id)
        .await?;
    Ok(Json(SelectDomainResponse {
        state: match activation_state {
            crate::activation::ActivationState::DomainActive(_) => "active",
            _ => "empty",
        },
        file_ids: files.iter().map(|f| f.file_id).collect(),
        file_names: files.into_iter().map(|f| f.file_name).collect(),
    }))
}

/// Resolve a domain id against its owner, 404 on mismatch.
async fn require_owned(
    state: &AppState,
    user_id: UserId,
    domain_id: DomainId,
) -> ApiResult<DomainRow> {
    state
        .store
        .get_user_domain(user_id, domain_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("domain {domain_id} not found")))
}
