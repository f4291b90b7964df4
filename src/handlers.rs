use std::time::Instant;

use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::warn;

use crate::{
    dispatch::{self, DispatchError},
    envelope::{JobEnvelope, NormalizedRequest, OpenAiCall},
    errors::AppError,
    state::AppState,
};

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(error) => AppError::Internal(format!("metrics render failed: {error}")).into_response(),
    }
}

pub async fn run(State(state): State<AppState>, Json(raw): Json<Value>) -> Response {
    job_surface(state, "/run", raw).await
}

pub async fn runsync(State(state): State<AppState>, Json(raw): Json<Value>) -> Response {
    job_surface(state, "/runsync", raw).await
}

/// Job surface: the runtime expects a JSON body back on every outcome,
/// so even an undeserializable envelope answers 200 with an error body.
async fn job_surface(state: AppState, path: &'static str, raw: Value) -> Response {
    let started = Instant::now();
    let _inflight = state.metrics.inflight_guard();

    let body = match serde_json::from_value::<JobEnvelope>(raw) {
        Ok(envelope) => dispatch::handle_job(&state, envelope).await,
        Err(error) => {
            warn!(error = %error, "invalid job envelope");
            json!({"error": format!("invalid job envelope: {error}")})
        }
    };

    let response = Json(body).into_response();
    state
        .metrics
        .observe_request(path, "POST", response.status().as_u16(), started.elapsed());
    response
}

pub async fn list_models(State(state): State<AppState>) -> Response {
    openai_surface(state, "/v1/models", "GET", json!({})).await
}

pub async fn chat_completions(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Response {
    openai_surface(state, "/v1/chat/completions", "POST", payload).await
}

pub async fn completions(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    openai_surface(state, "/v1/completions", "POST", payload).await
}

async fn openai_surface(
    state: AppState,
    route: &'static str,
    method: &'static str,
    payload: Value,
) -> Response {
    let started = Instant::now();
    let _inflight = state.metrics.inflight_guard();

    let call = NormalizedRequest::OpenAi(OpenAiCall {
        route: route.to_owned(),
        payload,
    });
    let response = match dispatch::dispatch(&state, call).await {
        Ok(body) => Json(body).into_response(),
        Err(error) => {
            if matches!(error, DispatchError::Backend(_)) {
                state.metrics.observe_backend_error(route);
            }
            AppError::from(error).into_response()
        }
    };

    state
        .metrics
        .observe_request(route, method, response.status().as_u16(), started.elapsed());
    response
}
