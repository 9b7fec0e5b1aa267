//! User provisioning and account overview handlers.

use crate::bootstrap::provision_user;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use doclink_core::{DomainId, UserId};
use doclink_store::UserProfile;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ProvisionRequest {
    pub user_id: UserId,
    pub user_name: String,
    #[serde(default)]
    pub user_surname: Option<String>,
    pub user_email: String,
    #[serde(default)]
    pub picture_url: Option<String>,
}

#[derive(Serialize)]
pub struct ProvisionResponse {
    pub user_id: UserId,
    /// Set when this call created the user's default domain.
    pub default_domain_id: Option<DomainId>,
}

/// POST /v1/users/provision - Upsert a user; first sight creates the
/// protected default domain with the seeded guide.
pub async fn provision(
    State(state): State<AppState>,
    Json(body): Json<ProvisionRequest>,
) -> ApiResult<Json<ProvisionResponse>> {
    let profile = UserProfile {
        user_id: body.user_id,
        user_name: body.user_name,
        user_surname: body.user_surname,
        user_email: body.user_email,
        picture_url: body.picture_url,
    };
    let default_domain_id = provision_user(
        state.store.as_ref(),
        state.sealer.as_ref(),
        state.reader.as_ref(),
        state.embedder.as_ref(),
        &profile,
    )
    .await?;

    Ok(Json(ProvisionResponse {
        user_id: body.user_id,
        default_domain_id,
    }))
}

#[derive(Serialize)]
pub struct FileSummary {
    pub file_id: uuid::Uuid,
    pub file_name: String,
}

#[derive(Serialize)]
pub struct DomainSummary {
    pub domain_id: uuid::Uuid,
    pub domain_name: String,
    pub domain_type: i16,
    pub files: Vec<FileSummary>,
}

#[derive(Serialize)]
pub struct OverviewResponse {
    pub user_id: UserId,
    pub user_name: String,
    pub user_email: String,
    pub user_type: String,
    pub picture_url: Option<String>,
    pub domains: Vec<DomainSummary>,
    /// Questions asked in the trailing 24 hours, for quota display.
    pub daily_question_count: u64,
}

/// GET /v1/users/{user_id}/overview - Profile, domains, files, and the
/// rolling question count.
pub async fn get_user_overview(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<OverviewResponse>> {
    let overview = state
        .store
        .user_overview(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))?;

    let domains = overview
        .domains
        .into_iter()
        .map(|entry| DomainSummary {
            domain_id: entry.domain.domain_id,
            domain_name: entry.domain.domain_name,
            domain_type: entry.domain.domain_type,
            files: entry
                .files
                .into_iter()
                .map(|f| FileSummary {
                    file_id: f.file_id,
                    file_name: f.file_name,
                })
                .collect(),
        })
        .collect();

    Ok(Json(OverviewResponse {
        user_id,
        user_name: overview.user.user_name,
        user_email: overview.user.user_email,
        user_type: overview.user.user_type,
        picture_url: overview.user.picture_url,
        domains,
        daily_question_count: overview.rolling_question_count,
    }))
}
