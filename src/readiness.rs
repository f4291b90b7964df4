use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::backend::CompletionBackend;

/// Bring-up gate: poll the backend's health endpoint until it answers,
/// or give up after `max_attempts`. The caller must not serve requests
/// when this returns false.
pub async fn wait_for_backend(
    backend: &dyn CompletionBackend,
    max_attempts: u32,
    delay: Duration,
) -> bool {
    info!(backend = backend.name(), "waiting for inference server");

    for attempt in 1..=max_attempts {
        match backend.health().await {
            Ok(()) => {
                info!(
                    backend = backend.name(),
                    attempt, "inference server is ready"
                );
                return true;
            }
            Err(cause) => {
                warn!(
                    backend = backend.name(),
                    attempt,
                    max_attempts,
                    error = %cause,
                    "inference server not ready"
                );
                sleep(delay).await;
            }
        }
    }

    error!(
        backend = backend.name(),
        max_attempts, "inference server failed to start"
    );
    false
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::mock::MockBackend;

    #[tokio::test]
    async fn succeeds_once_backend_reports_healthy() {
        let backend = Arc::new(MockBackend::unhealthy_for(2));
        assert!(wait_for_backend(backend.as_ref(), 5, Duration::ZERO).await);
    }

    #[tokio::test]
    async fn gives_up_after_bounded_attempts() {
        let backend = Arc::new(MockBackend::unhealthy_for(10));
        assert!(!wait_for_backend(backend.as_ref(), 3, Duration::ZERO).await);
    }

    #[tokio::test]
    async fn first_attempt_success_returns_immediately() {
        let backend = Arc::new(MockBackend::default());
        assert!(wait_for_backend(backend.as_ref(), 1, Duration::from_secs(60)).await);
    }
}
