pub mod llama;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

/// Generation parameters for a single completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionParams {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionParams {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: 256,
            temperature: 0.7,
        }
    }
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, params: CompletionParams) -> Result<String, BackendError>;
    async fn health(&self) -> Result<(), BackendError>;
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("connection error: {0}")]
    Unavailable(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("http status {status}: {body}")]
    Http { status: u16, body: String },
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),
}
