//! HTTP API server for Doclink.
//!
//! This crate provides the orchestrating layer:
//! - The domain activation orchestrator (working-set consistency)
//! - The upload staging pipeline (extract, embed, stage, commit)
//! - User provisioning and the protected default domain
//! - HTTP handlers, routing, and API error mapping

pub mod activation;
pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod routes;
pub mod state;

pub use activation::{ActivationError, ActivationState, DomainActivation};
pub use error::{ApiError, ApiResult};
pub use pipeline::{CommitOutcome, PipelineError, StagingPipeline};
pub use routes::create_router;
pub use state::AppState;
