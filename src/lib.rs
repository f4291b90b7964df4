pub mod backend;
pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod readiness;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};

use config::ServeMode;
use state::AppState;

pub fn build_app(state: AppState) -> Router {
    match state.config.mode {
        ServeMode::Worker => worker_app(state),
        ServeMode::OpenAi => openai_app(state),
    }
}

/// Job-envelope surface: the shape the hosting platform's runtime
/// invokes the handler with.
pub fn worker_app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::metrics))
        .route("/run", post(handlers::run))
        .route("/runsync", post(handlers::runsync))
        .with_state(state)
}

/// Direct OpenAI-compatible surface for standalone deployments.
pub fn openai_app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::metrics))
        .route("/v1/models", get(handlers::list_models))
        .route("/v1/chat/completions", post(handlers::chat_completions))
        .route("/v1/completions", post(handlers::completions))
        .with_state(state)
}
