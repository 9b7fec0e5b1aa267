//! Upload staging and commit handlers.

use crate::error::{ApiError, ApiResult};
use crate::handlers::UserQuery;
use crate::pipeline::CommitOutcome;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Multipart, Query, State};
use doclink_core::FileId;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

#[derive(Serialize)]
pub struct StageResponse {
    pub message: &'static str,
    pub file_name: String,
}

/// POST /v1/uploads/files - Extract, embed, and stage one uploaded file.
///
/// Multipart fields: `file` (the document) and optionally
/// `last_modified` (epoch milliseconds, as browsers report it).
pub async fn stage_file(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
    mut multipart: Multipart,
) -> ApiResult<Json<StageResponse>> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut last_modified: Option<Date> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let field_name = field.name().map(|s| s.to_string());
        match field_name.as_deref() {
            Some("file") => {
                let name = field
                    .file_name()
                    .ok_or_else(|| ApiError::BadRequest("file field has no filename".to_string()))?
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;
                file = Some((name, bytes.to_vec()));
            }
            Some("last_modified") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read field: {e}")))?;
                last_modified = Some(parse_epoch_millis(&raw)?);
            }
            _ => {}
        }
    }

    let (file_name, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("missing file field".to_string()))?;
    let last_modified = last_modified.unwrap_or_else(|| OffsetDateTime::now_utc().date());

    state
        .pipeline
        .stage_document(query.user_id, &file_name, last_modified, &bytes)
        .await?;

    Ok(Json(StageResponse {
        message: "success",
        file_name,
    }))
}

#[derive(Debug, Deserialize)]
pub struct StageUrlRequest {
    pub url: String,
}

/// POST /v1/uploads/url - Fetch a URL and stage its content under the
/// URL as the file name.
pub async fn stage_url(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
    Json(body): Json<StageUrlRequest>,
) -> ApiResult<Json<StageResponse>> {
    let url = reqwest::Url::parse(body.url.trim())
        .map_err(|_| ApiError::Validation("invalid URL".to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::Validation("only http(s) URLs are supported".to_string()));
    }

    let response = state
        .http
        .get(url.clone())
        .send()
        .await
        .map_err(|e| ApiError::BadRequest(format!("error fetching the URL: {e}")))?;
    if !response.status().is_success() {
        return Err(ApiError::BadRequest(format!(
            "error fetching the URL: status {}",
            response.status()
        )));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApiError::BadRequest(format!("error reading the URL body: {e}")))?;
    if bytes.len() > state.config.server.max_upload_bytes {
        return Err(ApiError::Validation(format!(
            "fetched document exceeds the {} byte limit",
            state.config.server.max_upload_bytes
        )));
    }

    let file_name = url.to_string();
    state
        .pipeline
        .stage_document(
            query.user_id,
            &file_name,
            OffsetDateTime::now_utc().date(),
            &bytes,
        )
        .await?;

    Ok(Json(StageResponse {
        message: "success",
        file_name,
    }))
}

#[derive(Serialize)]
pub struct CommitResponse {
    pub message: &'static str,
    pub file_ids: Vec<FileId>,
    pub file_names: Vec<String>,
}

/// POST /v1/uploads/commit - Drain the user's staged uploads into the
/// selected domain as one durable batch.
pub async fn commit_uploads(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<CommitResponse>> {
    match state.pipeline.commit(query.user_id).await? {
        CommitOutcome::Committed {
            file_ids,
            file_names,
            state: _,
        } => Ok(Json(CommitResponse {
            message: "success",
            file_ids,
            file_names,
        })),
        CommitOutcome::Rejected(denied) => Err(ApiError::QuotaExceeded(denied)),
        CommitOutcome::NothingStaged => {
            Err(ApiError::BadRequest("no files staged for upload".to_string()))
        }
    }
}

/// Parse a browser-reported `lastModified` epoch-milliseconds value.
fn parse_epoch_millis(raw: &str) -> ApiResult<Date> {
    let millis: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid last_modified value: {raw}")))?;
    let timestamp = OffsetDateTime::from_unix_timestamp(millis / 1000)
        .map_err(|_| ApiError::BadRequest(format!("last_modified out of range: {raw}")))?;
    Ok(timestamp.date())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_epoch_millis() {
        // 2025-01-15T00:00:00Z
        let date = parse_epoch_millis("1736899200000").unwrap();
        assert_eq!(date.year(), 2025);
        assert!(parse_epoch_millis("not-a-number").is_err());
    }
}
