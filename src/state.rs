use std::sync::Arc;

use crate::{backend::CompletionBackend, config::Config, metrics::AppMetrics};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub backend: Arc<dyn CompletionBackend>,
    pub metrics: Arc<AppMetrics>,
}

impl AppState {
    pub fn new<B>(config: Config, backend: Arc<B>) -> Self
    where
        B: CompletionBackend + 'static,
    {
        Self {
            config: Arc::new(config),
            backend,
            metrics: Arc::new(AppMetrics::new()),
        }
    }

    pub fn for_tests<B>(backend: Arc<B>) -> Self
    where
        B: CompletionBackend + 'static,
    {
        Self::new(Config::for_tests(), backend)
    }
}
