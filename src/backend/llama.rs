use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    backend::{BackendError, CompletionBackend, CompletionParams},
    config::Config,
};

const COMPLETION_TIMEOUT: Duration = Duration::from_secs(120);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for a llama.cpp server running next to this process.
///
/// One `reqwest::Client` is built at startup and reused for every call.
#[derive(Clone)]
pub struct LlamaCppBackend {
    client: reqwest::Client,
    base_url: String,
}

impl LlamaCppBackend {
    pub fn new(config: &Config) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(COMPLETION_TIMEOUT)
            .build()
            .map_err(|error| format!("failed to build llama.cpp HTTP client: {error}"))?;

        Ok(Self {
            client,
            base_url: config.backend_base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn map_send_error(&self, error: reqwest::Error) -> BackendError {
        if error.is_timeout() {
            BackendError::Timeout(format!("llama.cpp server at {}: {error}", self.base_url))
        } else {
            BackendError::Unavailable(format!(
                "cannot reach llama.cpp server at {}: {error}",
                self.base_url
            ))
        }
    }
}

#[async_trait]
impl CompletionBackend for LlamaCppBackend {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn complete(&self, params: CompletionParams) -> Result<String, BackendError> {
        let payload = json!({
            "prompt": params.prompt,
            "n_predict": params.max_tokens,
            "temperature": params.temperature,
            "stream": false,
        });

        let response = self
            .client
            .post(self.url("/completion"))
            .json(&payload)
            .send()
            .await
            .map_err(|error| self.map_send_error(error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Http {
                status: status.as_u16(),
                body: response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unknown backend error".to_owned())
                    .chars()
                    .take(400)
                    .collect(),
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|error| BackendError::UnexpectedShape(error.to_string()))?;

        debug!(backend = %self.base_url, n_predict = params.max_tokens, "completion received");
        completion_text(&data)
    }

    async fn health(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .get(self.url("/health"))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(|error| self.map_send_error(error))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(BackendError::Http {
                status: status.as_u16(),
                body: "health check failed".to_owned(),
            })
        }
    }
}

/// llama.cpp returns either a top-level `content` string or an
/// OpenAI-style `choices` list; both reduce to the generated text.
fn completion_text(data: &Value) -> Result<String, BackendError> {
    if let Some(content) = data.get("content").and_then(Value::as_str) {
        return Ok(content.to_owned());
    }

    if let Some(text) = data
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("text"))
        .and_then(Value::as_str)
    {
        return Ok(text.to_owned());
    }

    Err(BackendError::UnexpectedShape(data.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_field_is_preferred() {
        let data = json!({"content": "X", "choices": [{"text": "Y"}]});
        assert_eq!(completion_text(&data).expect("content shape"), "X");
    }

    #[test]
    fn choices_shape_normalizes_to_same_text() {
        let from_content = completion_text(&json!({"content": "X"})).expect("content shape");
        let from_choices =
            completion_text(&json!({"choices": [{"text": "X"}]})).expect("choices shape");
        assert_eq!(from_content, from_choices);
    }

    #[test]
    fn unknown_shape_is_rejected() {
        let error = completion_text(&json!({"result": "X"})).expect_err("unknown shape");
        assert!(matches!(error, BackendError::UnexpectedShape(_)));
    }

    #[test]
    fn empty_choices_list_is_rejected() {
        let error = completion_text(&json!({"choices": []})).expect_err("empty choices");
        assert!(matches!(error, BackendError::UnexpectedShape(_)));
    }
}
