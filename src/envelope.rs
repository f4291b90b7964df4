use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Wrapper the hosting platform's job runtime passes to the handler.
///
/// Origin-controlled and unvalidated: the platform sometimes puts
/// `openai_input`/`openai_route` at the top level and sometimes wraps
/// them under `input`. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobEnvelope {
    #[serde(default)]
    pub input: Option<Value>,
    #[serde(default)]
    pub openai_input: Option<Value>,
    #[serde(default)]
    pub openai_route: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

/// Result of normalizing an inbound envelope: a closed set of variants
/// so dispatch is a total match instead of nested fallbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedRequest {
    Native(NativeRequest),
    OpenAi(OpenAiCall),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiCall {
    pub route: String,
    pub payload: Value,
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error(
        "No prompt provided. Use the 'prompt' or 'text' field, or the OpenAI-compatible routes"
    )]
    NoPrompt,
}

/// Reduce the envelope's possible shapes to one request.
///
/// Top-level `openai_input`/`openai_route` win over the `input`-nested
/// equivalents: the platform double-wraps payloads on some paths and
/// exactly one layer must be unwrapped, deterministically. A payload
/// that arrives as a JSON-encoded string is parsed here; if parsing
/// fails the raw string is kept and the route handler reports it.
pub fn normalize(envelope: JobEnvelope) -> Result<NormalizedRequest, NormalizeError> {
    let input_section = envelope
        .input
        .as_ref()
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let openai_input = envelope
        .openai_input
        .into_iter()
        .chain(input_section.get("openai_input").cloned())
        .chain(input_section.get("body").cloned())
        .find(|value| !value.is_null());

    let Some(payload) = openai_input else {
        return native_request(&input_section).map(NormalizedRequest::Native);
    };

    let payload = match payload {
        Value::String(text) => {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        }
        other => other,
    };

    let route = envelope
        .openai_route
        .filter(|route| !route.is_empty())
        .or_else(|| {
            input_section
                .get("openai_route")
                .and_then(Value::as_str)
                .filter(|route| !route.is_empty())
                .map(ToOwned::to_owned)
        })
        .or_else(|| envelope.path)
        .unwrap_or_default();

    Ok(NormalizedRequest::OpenAi(OpenAiCall { route, payload }))
}

fn native_request(input: &Map<String, Value>) -> Result<NativeRequest, NormalizeError> {
    let prompt = non_empty_str(input, "prompt")
        .or_else(|| non_empty_str(input, "text"))
        .map(ToOwned::to_owned)
        .or_else(|| {
            input
                .get("test")
                .map(stringify)
                .filter(|prompt| !prompt.is_empty())
        })
        .ok_or(NormalizeError::NoPrompt)?;

    Ok(NativeRequest {
        prompt,
        max_tokens: input
            .get("max_tokens")
            .and_then(Value::as_u64)
            .map(|value| value as u32)
            .unwrap_or(256),
        temperature: input
            .get("temperature")
            .and_then(Value::as_f64)
            .map(|value| value as f32)
            .unwrap_or(0.7),
    })
}

fn non_empty_str<'a>(input: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    input
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
