//! API error types.

use crate::activation::ActivationError;
use crate::pipeline::PipelineError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use doclink_core::QuotaDenied;
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("no domain selected")]
    NoDomainSelected,

    #[error("{0}")]
    QuotaExceeded(QuotaDenied),

    #[error("store error: {0}")]
    Store(#[from] doclink_store::StoreError),

    #[error("cache error: {0}")]
    Cache(#[from] doclink_cache::CacheError),

    #[error("engine error: {0}")]
    Engine(#[from] doclink_engine::EngineError),

    #[error("sealer error: {0}")]
    Sealer(#[from] doclink_sealer::SealerError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ActivationError> for ApiError {
    fn from(e: ActivationError) -> Self {
        match e {
            ActivationError::Store(e) => Self::Store(e),
            ActivationError::Cache(e) => Self::Cache(e),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::NoDomainSelected => Self::NoDomainSelected,
            PipelineError::UnknownDomain => {
                Self::BadRequest("selected domain no longer exists".to_string())
            }
            PipelineError::Validation(msg) => Self::Validation(msg),
            PipelineError::Engine(e) => Self::Engine(e),
            PipelineError::Sealer(e) => Self::Sealer(e),
            PipelineError::Store(e) => Self::Store(e),
            PipelineError::Cache(e) => Self::Cache(e),
        }
    }
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Validation(_) => "validation_failed",
            Self::NoDomainSelected => "no_domain_selected",
            Self::QuotaExceeded(_) => "quota_exceeded",
            Self::Store(_) => "store_error",
            Self::Cache(_) => "cache_error",
            Self::Engine(_) => "extraction_failed",
            Self::Sealer(_) => "sealer_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    ///
    /// Business rejections (quota, validation) are 4xx; transport
    /// failures of the store or cache are 503 so clients can retry —
    /// per contract, those failures leave no partial side effects.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NoDomainSelected => StatusCode::BAD_REQUEST,
            Self::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Store(e) => match e {
                doclink_store::StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                doclink_store::StoreError::AlreadyExists(_) => StatusCode::CONFLICT,
                doclink_store::StoreError::InvalidBatch(_) => StatusCode::BAD_REQUEST,
                doclink_store::StoreError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Cache(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Engine(_) => StatusCode::BAD_REQUEST,
            Self::Sealer(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
