use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ModelList {
    pub object: &'static str,
    pub data: Vec<ModelEntry>,
}

#[derive(Debug, Serialize)]
pub struct ModelEntry {
    pub id: String,
    pub object: &'static str,
}

impl ModelList {
    pub fn single(model: &str) -> Self {
        Self {
            object: "list",
            data: vec![ModelEntry {
                id: model.to_owned(),
                object: "model",
            }],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct ChatChoice {
    pub index: usize,
    pub message: AssistantMessage,
    pub finish_reason: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AssistantMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatCompletionResponse {
    pub fn from_output(model: &str, output: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            object: "chat.completion",
            created: unix_timestamp(),
            model: model.to_owned(),
            choices: vec![ChatChoice {
                index: 0,
                message: AssistantMessage {
                    role: "assistant",
                    content: output,
                },
                finish_reason: "stop",
            }],
            usage: Map::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TextCompletionResponse {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub model: String,
    pub choices: Vec<TextChoice>,
    pub usage: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct TextChoice {
    pub index: usize,
    pub text: String,
    pub finish_reason: &'static str,
}

impl TextCompletionResponse {
    pub fn from_output(model: &str, output: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            object: "text_completion",
            created: unix_timestamp(),
            model: model.to_owned(),
            choices: vec![TextChoice {
                index: 0,
                text: output,
                finish_reason: "stop",
            }],
            usage: Map::new(),
        }
    }
}

/// Response envelope for the platform's own request format.
#[derive(Debug, Serialize)]
pub struct NativeResponse {
    pub status: &'static str,
    pub output: String,
    pub model: String,
}

impl NativeResponse {
    pub fn success(model: &str, output: String) -> Self {
        Self {
            status: "success",
            output,
            model: model.to_owned(),
        }
    }
}

pub fn unix_timestamp() -> i64 {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_secs() as i64
}
