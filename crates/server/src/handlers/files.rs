//! File removal handler.

use crate::error::{ApiError, ApiResult};
use crate::handlers::UserQuery;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use doclink_core::{DomainId, FileId};
use serde::Serialize;

#[derive(Serialize)]
pub struct DeleteFileResponse {
    pub message: &'static str,
}

/// DELETE /v1/files/{file_id} - Remove a file and its content, then
/// republish the owning domain's working set.
pub async fn delete_file(
    State(state): State<AppState>,
    Path(file_id): Path<FileId>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<DeleteFileResponse>> {
    let file = state
        .store
        .get_file(file_id)
        .await?
        .filter(|f| f.user_id == *query.user_id.as_uuid())
        .ok_or_else(|| ApiError::NotFound(format!("file {file_id} not found")))?;

    if !state.store.delete_file(file_id).await? {
        return Err(ApiError::NotFound(format!("file {file_id} not found")));
    }

    state
        .activation
        .on_file_removed(query.user_id, DomainId::from(file.domain_id))
        .await?;

    Ok(Json(DeleteFileResponse { message: "success" }))
}
