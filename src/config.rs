use std::{env, time::Duration};

/// Which inbound surface the process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeMode {
    /// Job-envelope surface the hosting platform's runtime invokes
    /// (`POST /run`, `POST /runsync`).
    Worker,
    /// Direct OpenAI-compatible surface.
    OpenAi,
}

/// Process configuration, built once from the environment at startup and
/// passed into every component through `AppState`.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_base_url: String,
    pub model_name: String,
    pub listen_port: u16,
    pub mode: ServeMode,
    pub ready_max_attempts: u32,
    pub ready_delay: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let backend_port = read_u16("LLAMA_SERVER_PORT", 8000);
        let mode = match env::var("ADAPTER_MODE").as_deref() {
            Ok("openai") => ServeMode::OpenAi,
            _ => ServeMode::Worker,
        };

        Self {
            backend_base_url: format!("http://127.0.0.1:{backend_port}"),
            model_name: env::var("MODEL_NAME")
                .unwrap_or_else(|_| "fingpt-mt-llama3-8b-lora-gguf".to_owned()),
            listen_port: read_u16("ADAPTER_LISTEN_PORT", 8001),
            mode,
            ready_max_attempts: read_u32("ADAPTER_READY_MAX_ATTEMPTS", 30),
            ready_delay: Duration::from_secs(read_u64("ADAPTER_READY_DELAY_SECS", 2)),
        }
    }

    pub fn for_tests() -> Self {
        Self {
            backend_base_url: "http://127.0.0.1:8000".to_owned(),
            model_name: "fingpt-mt-llama3-8b-lora-gguf".to_owned(),
            listen_port: 8001,
            mode: ServeMode::Worker,
            ready_max_attempts: 3,
            ready_delay: Duration::ZERO,
        }
    }
}

fn read_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(default)
}

fn read_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}

fn read_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}
