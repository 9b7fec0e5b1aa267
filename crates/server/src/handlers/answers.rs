//! Question answering handler.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Query, State};
use doclink_core::{FileId, SessionId, UserId};
use doclink_engine::AnswerResource;
use doclink_store::QuestionAdmission;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AskQuery {
    pub user_id: UserId,
    pub session_id: SessionId,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub file_ids: Vec<FileId>,
}

#[derive(Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub resources: Vec<AnswerResource>,
    pub resource_sentences: Vec<String>,
    /// The session's question count after this question.
    pub question_count: u64,
}

/// POST /v1/answers - Answer a question against the selected domain.
///
/// Order of checks mirrors the admission contract: cheap validation
/// first, then the atomic quota check, then the search — so a denied
/// question never consumes search work, and a validation failure never
/// consumes quota.
pub async fn ask(
    State(state): State<AppState>,
    Query(query): Query<AskQuery>,
    Json(body): Json<AskRequest>,
) -> ApiResult<Json<AskResponse>> {
    if body.question.trim().is_empty() {
        return Err(ApiError::Validation("question cannot be empty".to_string()));
    }
    if body.file_ids.is_empty() {
        return Err(ApiError::BadRequest("no files selected".to_string()));
    }
    if state.cache.selected_domain(query.user_id).await?.is_none() {
        return Err(ApiError::NoDomainSelected);
    }

    let question_count = match state
        .store
        .admit_question(query.user_id, query.session_id)
        .await?
    {
        QuestionAdmission::Granted { question_count } => question_count,
        QuestionAdmission::Denied(denied) => return Err(ApiError::QuotaExceeded(denied)),
    };

    // Recover the working set on cache miss; the orchestrator guarantees
    // whatever it returns reflects the current membership.
    let Some(working_set) = state.activation.recover(query.user_id).await? else {
        return Err(ApiError::BadRequest(
            "the selected domain has no searchable content".to_string(),
        ));
    };

    let members: Vec<FileId> = body
        .file_ids
        .iter()
        .copied()
        .filter(|id| working_set.contains_file(*id))
        .collect();
    if members.is_empty() {
        return Err(ApiError::BadRequest(
            "none of the selected files are part of the active domain".to_string(),
        ));
    }

    let Some(index) = state.answerer.filter_search(&working_set, &members) else {
        return Err(ApiError::BadRequest(
            "nothing to search in the selected files".to_string(),
        ));
    };
    let answer = state.answerer.search(&body.question, &index)?;

    state.cache.refresh_user_ttl(query.user_id).await?;

    Ok(Json(AskResponse {
        answer: answer.answer,
        resources: answer.resources,
        resource_sentences: answer.resource_sentences,
        question_count,
    }))
}
