//! Route configuration.

use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let max_body = state.config.server.max_upload_bytes;

    Router::new()
        // Health check (intentionally unauthenticated for load balancers)
        .route("/v1/health", get(handlers::health_check))
        // Users
        .route("/v1/users/provision", post(handlers::provision))
        .route(
            "/v1/users/{user_id}/overview",
            get(handlers::get_user_overview),
        )
        // Domains
        .route("/v1/domains", post(handlers::create_domain))
        .route(
            "/v1/domains/{domain_id}/rename",
            post(handlers::rename_domain),
        )
        .route("/v1/domains/{domain_id}", delete(handlers::delete_domain))
        .route(
            "/v1/domains/{domain_id}/select",
            post(handlers::select_domain),
        )
        // Upload staging pipeline
        .route("/v1/uploads/files", post(handlers::stage_file))
        .route("/v1/uploads/url", post(handlers::stage_url))
        .route("/v1/uploads/commit", post(handlers::commit_uploads))
        // Files
        .route("/v1/files/{file_id}", delete(handlers::delete_file))
        // Answers
        .route("/v1/answers", post(handlers::ask))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
