use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    backend::{BackendError, CompletionParams},
    envelope::{normalize, JobEnvelope, NativeRequest, NormalizeError, NormalizedRequest, OpenAiCall},
    models::{ChatCompletionResponse, ModelList, NativeResponse, TextCompletionResponse},
    state::AppState,
};

pub const AVAILABLE_ROUTES: [&str; 3] =
    ["/v1/models", "/v1/chat/completions", "/v1/completions"];

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Malformed(#[from] NormalizeError),
    #[error("Unknown OpenAI route: {0}")]
    UnknownRoute(String),
    #[error("{0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl DispatchError {
    /// Error body in the shape the job runtime returns to the caller.
    /// A missing prompt keeps the platform's `status`/`message` form;
    /// an unknown route names the supported ones as a hint.
    pub fn into_job_body(self) -> Value {
        match self {
            DispatchError::Malformed(error) => json!({
                "status": "error",
                "message": error.to_string(),
            }),
            DispatchError::UnknownRoute(route) => json!({
                "error": format!("Unknown OpenAI route: {route}"),
                "available_routes": AVAILABLE_ROUTES,
            }),
            DispatchError::InvalidPayload(message) => json!({"error": message}),
            DispatchError::Backend(error) => json!({"error": error.to_string()}),
        }
    }
}

/// Handle one job envelope end to end. Every failure is reduced to a
/// JSON error body here; nothing escapes to the runtime.
pub async fn handle_job(state: &AppState, envelope: JobEnvelope) -> Value {
    let normalized = match normalize(envelope) {
        Ok(normalized) => normalized,
        Err(error) => {
            warn!(error = %error, "rejected job envelope");
            return DispatchError::from(error).into_job_body();
        }
    };

    match dispatch(state, normalized).await {
        Ok(body) => body,
        Err(error) => {
            warn!(error = %error, "job failed");
            if matches!(error, DispatchError::Backend(_)) {
                state.metrics.observe_backend_error("job");
            }
            error.into_job_body()
        }
    }
}

/// Total match over the normalized request variants.
pub async fn dispatch(
    state: &AppState,
    request: NormalizedRequest,
) -> Result<Value, DispatchError> {
    match request {
        NormalizedRequest::Native(native) => native_completion(state, native).await,
        NormalizedRequest::OpenAi(call) => openai_call(state, call).await,
    }
}

async fn native_completion(
    state: &AppState,
    request: NativeRequest,
) -> Result<Value, DispatchError> {
    let output = state
        .backend
        .complete(CompletionParams {
            prompt: request.prompt,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        })
        .await?;

    let body = NativeResponse::success(&state.config.model_name, output);
    Ok(serde_json::to_value(body).unwrap_or_default())
}

async fn openai_call(state: &AppState, call: OpenAiCall) -> Result<Value, DispatchError> {
    // Precedence matters: "/v1/chat/completions" also contains
    // "/completions", so chat must be matched first.
    if call.route.contains("/v1/models") || call.route == "/models" {
        let body = ModelList::single(&state.config.model_name);
        return Ok(serde_json::to_value(body).unwrap_or_default());
    }

    if call.route.contains("/v1/chat/completions") || call.route.contains("/chat/completions") {
        return chat_completion(state, call.payload).await;
    }

    if call.route.contains("/v1/completions") || call.route.contains("/completions") {
        return text_completion(state, call.payload).await;
    }

    Err(DispatchError::UnknownRoute(call.route))
}

async fn chat_completion(state: &AppState, payload: Value) -> Result<Value, DispatchError> {
    let body = require_object(&payload)?;

    let messages = body
        .get("messages")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let prompt = messages
        .iter()
        .map(|message| {
            message
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join("\n");

    let output = state
        .backend
        .complete(generation_params(prompt, body))
        .await?;

    info!(model = %state.config.model_name, "chat completion served");
    let response = ChatCompletionResponse::from_output(&state.config.model_name, output);
    Ok(serde_json::to_value(response).unwrap_or_default())
}

async fn text_completion(state: &AppState, payload: Value) -> Result<Value, DispatchError> {
    let body = require_object(&payload)?;

    let prompt = body
        .get("prompt")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    let output = state
        .backend
        .complete(generation_params(prompt, body))
        .await?;

    info!(model = %state.config.model_name, "text completion served");
    let response = TextCompletionResponse::from_output(&state.config.model_name, output);
    Ok(serde_json::to_value(response).unwrap_or_default())
}

fn require_object(payload: &Value) -> Result<&serde_json::Map<String, Value>, DispatchError> {
    payload.as_object().ok_or_else(|| {
        DispatchError::InvalidPayload("openai_input must be a JSON object".to_owned())
    })
}

fn generation_params(prompt: String, body: &serde_json::Map<String, Value>) -> CompletionParams {
    CompletionParams {
        prompt,
        max_tokens: body
            .get("max_tokens")
            .and_then(Value::as_u64)
            .map(|value| value as u32)
            .unwrap_or(256),
        temperature: body
            .get("temperature")
            .and_then(Value::as_f64)
            .map(|value| value as f32)
            .unwrap_or(0.7),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::backend::mock::MockBackend;

    fn envelope(value: Value) -> JobEnvelope {
        serde_json::from_value(value).expect("envelope should deserialize")
    }

    fn state_with(mock: Arc<MockBackend>) -> AppState {
        AppState::for_tests(mock)
    }

    #[tokio::test]
    async fn models_route_is_static_and_never_calls_backend() {
        let mock = Arc::new(MockBackend::default());
        let state = state_with(mock.clone());

        let first = handle_job(
            &state,
            envelope(json!({"openai_route": "/v1/models", "openai_input": {}})),
        )
        .await;
        let second = handle_job(
            &state,
            envelope(json!({"openai_route": "/v1/models", "openai_input": {}})),
        )
        .await;

        assert_eq!(first, second);
        assert_eq!(
            first,
            json!({
                "object": "list",
                "data": [{"id": "fingpt-mt-llama3-8b-lora-gguf", "object": "model"}]
            })
        );
        assert_eq!(mock.completion_calls(), 0);
    }

    #[tokio::test]
    async fn chat_route_joins_message_contents_into_prompt() {
        let mock = Arc::new(MockBackend::replying("sure"));
        let state = state_with(mock.clone());

        let body = handle_job(
            &state,
            envelope(json!({
                "openai_route": "/v1/chat/completions",
                "openai_input": {
                    "messages": [
                        {"role": "system", "content": "be brief"},
                        {"role": "user", "content": "Hi"}
                    ],
                    "max_tokens": 32
                }
            })),
        )
        .await;

        let params = mock.last_params().expect("backend called");
        assert_eq!(params.prompt, "be brief\nHi");
        assert_eq!(params.max_tokens, 32);

        assert_eq!(body["object"], "chat.completion");
        assert_eq!(body["choices"][0]["message"]["content"], "sure");
        assert_eq!(body["choices"][0]["finish_reason"], "stop");
    }

    #[tokio::test]
    async fn completions_route_uses_payload_prompt() {
        let mock = Arc::new(MockBackend::replying("continued"));
        let state = state_with(mock.clone());

        let body = handle_job(
            &state,
            envelope(json!({
                "openai_route": "/v1/completions",
                "openai_input": {"prompt": "Once upon", "temperature": 0.1}
            })),
        )
        .await;

        let params = mock.last_params().expect("backend called");
        assert_eq!(params.prompt, "Once upon");
        assert!((params.temperature - 0.1).abs() < 1e-6);

        assert_eq!(body["object"], "text_completion");
        assert_eq!(body["choices"][0]["text"], "continued");
    }

    #[tokio::test]
    async fn native_envelope_returns_success_body() {
        let mock = Arc::new(MockBackend::replying("Hi there"));
        let state = state_with(mock.clone());

        let body = handle_job(
            &state,
            envelope(json!({"input": {"prompt": "Hello", "max_tokens": 5}})),
        )
        .await;

        assert_eq!(
            body,
            json!({
                "status": "success",
                "output": "Hi there",
                "model": "fingpt-mt-llama3-8b-lora-gguf"
            })
        );
        assert_eq!(mock.last_params().expect("backend called").max_tokens, 5);
    }

    #[tokio::test]
    async fn missing_prompt_fails_before_any_backend_call() {
        let mock = Arc::new(MockBackend::default());
        let state = state_with(mock.clone());

        let body = handle_job(&state, envelope(json!({"input": {"max_tokens": 5}}))).await;

        assert_eq!(body["status"], "error");
        assert!(body["message"]
            .as_str()
            .expect("message")
            .contains("No prompt provided"));
        assert_eq!(mock.completion_calls(), 0);
    }

    #[tokio::test]
    async fn unknown_route_lists_supported_routes_without_backend_call() {
        let mock = Arc::new(MockBackend::default());
        let state = state_with(mock.clone());

        let body = handle_job(
            &state,
            envelope(json!({"openai_route": "/unknown/path", "openai_input": {}})),
        )
        .await;

        assert_eq!(
            body["error"],
            json!("Unknown OpenAI route: /unknown/path")
        );
        assert_eq!(
            body["available_routes"],
            json!(["/v1/models", "/v1/chat/completions", "/v1/completions"])
        );
        assert_eq!(mock.completion_calls(), 0);
    }

    #[tokio::test]
    async fn backend_failure_becomes_error_body() {
        let mock = Arc::new(MockBackend::failing());
        let state = state_with(mock);

        let body = handle_job(&state, envelope(json!({"input": {"prompt": "Hello"}}))).await;

        assert!(body["error"]
            .as_str()
            .expect("error message")
            .contains("mock backend is down"));
    }

    #[tokio::test]
    async fn raw_string_payload_is_reported_not_crashed_on() {
        let mock = Arc::new(MockBackend::default());
        let state = state_with(mock.clone());

        let body = handle_job(
            &state,
            envelope(json!({
                "openai_route": "/v1/chat/completions",
                "openai_input": "not json at all"
            })),
        )
        .await;

        assert_eq!(body["error"], json!("openai_input must be a JSON object"));
        assert_eq!(mock.completion_calls(), 0);
    }

    #[tokio::test]
    async fn chat_precedence_beats_completions_substring() {
        let mock = Arc::new(MockBackend::replying("ok"));
        let state = state_with(mock);

        let body = handle_job(
            &state,
            envelope(json!({
                "openai_route": "/openai/v1/chat/completions",
                "openai_input": {"messages": [{"role": "user", "content": "Hi"}]}
            })),
        )
        .await;

        assert_eq!(body["object"], "chat.completion");
    }
}
