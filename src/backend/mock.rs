use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;

use crate::backend::{BackendError, CompletionBackend, CompletionParams};

/// Scripted backend for tests.
///
/// Records every completion call so "no backend call was made" is
/// assertable, and can be configured to fail completions or to report
/// unhealthy for the first N health checks.
#[derive(Debug)]
pub struct MockBackend {
    name: String,
    reply: String,
    fail_completions: bool,
    unhealthy_checks: AtomicUsize,
    completion_calls: AtomicUsize,
    last_params: Mutex<Option<CompletionParams>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            name: "mock-backend".to_owned(),
            reply: "mock reply".to_owned(),
            fail_completions: false,
            unhealthy_checks: AtomicUsize::new(0),
            completion_calls: AtomicUsize::new(0),
            last_params: Mutex::new(None),
        }
    }
}

impl MockBackend {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_completions: true,
            ..Self::default()
        }
    }

    pub fn unhealthy_for(checks: usize) -> Self {
        Self {
            unhealthy_checks: AtomicUsize::new(checks),
            ..Self::default()
        }
    }

    pub fn completion_calls(&self) -> usize {
        self.completion_calls.load(Ordering::SeqCst)
    }

    pub fn last_params(&self) -> Option<CompletionParams> {
        self.last_params.lock().expect("mock lock").clone()
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, params: CompletionParams) -> Result<String, BackendError> {
        self.completion_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().expect("mock lock") = Some(params);

        if self.fail_completions {
            return Err(BackendError::Unavailable(
                "mock backend is down".to_owned(),
            ));
        }

        Ok(self.reply.clone())
    }

    async fn health(&self) -> Result<(), BackendError> {
        let remaining = self.unhealthy_checks.load(Ordering::SeqCst);
        if remaining > 0 {
            self.unhealthy_checks.store(remaining - 1, Ordering::SeqCst);
            return Err(BackendError::Unavailable(
                "mock backend still starting".to_owned(),
            ));
        }

        Ok(())
    }
}
