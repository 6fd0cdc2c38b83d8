//! Bounded click followed by a fixed settle delay.

use crate::backend::{Backend, BackendError};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("Click timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Click failed: {0}")]
    Failed(#[from] BackendError),
}

/// Click the `index`-th match of `selector`, then wait `settle` for the UI to update.
///
/// The backend receives the same budget for its own actionability waits, and the
/// whole call is additionally capped so a hung backend cannot stall the run.
pub async fn click_and_settle<B: Backend + ?Sized>(
    backend: &mut B,
    selector: &str,
    index: usize,
    click_timeout: Duration,
    settle: Duration,
) -> Result<(), InteractionError> {
    let timeout_ms = click_timeout.as_millis() as u64;
    match tokio::time::timeout(
        click_timeout,
        backend.click_element(selector, index, click_timeout),
    )
    .await
    {
        Err(_) => return Err(InteractionError::Timeout { timeout_ms }),
        Ok(Err(BackendError::Timeout { .. })) => {
            return Err(InteractionError::Timeout { timeout_ms });
        }
        Ok(Err(e)) => return Err(e.into()),
        Ok(Ok(())) => {}
    }

    debug!("Clicked element {}, settling for {:?}", index, settle);
    tokio::time::sleep(settle).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NavigationResult;
    use async_trait::async_trait;
    use tokio::time::Instant;
    use uiscope_common::protocol::{AxNodeRecord, InspectedElement};

    /// Answers every click with a fixed outcome.
    struct ClickOnly {
        outcome: fn() -> Result<(), BackendError>,
        clicks: usize,
    }

    #[async_trait]
    impl Backend for ClickOnly {
        async fn launch(&mut self) -> Result<(), BackendError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), BackendError> {
            Ok(())
        }

        async fn is_ready(&self) -> bool {
            true
        }

        async fn navigate(
            &mut self,
            url: &str,
            _timeout: Duration,
        ) -> Result<NavigationResult, BackendError> {
            Ok(NavigationResult {
                url: url.to_string(),
                title: String::new(),
            })
        }

        async fn count_matching(&mut self, _selector: &str) -> Result<usize, BackendError> {
            Ok(1)
        }

        async fn inspect_element(
            &mut self,
            selector: &str,
            index: usize,
        ) -> Result<InspectedElement, BackendError> {
            Err(BackendError::ElementNotFound {
                selector: selector.to_string(),
                index,
            })
        }

        async fn click_element(
            &mut self,
            _selector: &str,
            _index: usize,
            _timeout: Duration,
        ) -> Result<(), BackendError> {
            self.clicks += 1;
            (self.outcome)()
        }

        async fn accessibility_tree(&mut self) -> Result<Vec<AxNodeRecord>, BackendError> {
            Ok(Vec::new())
        }
    }

    const CLICK: Duration = Duration::from_millis(2000);
    const SETTLE: Duration = Duration::from_millis(500);

    #[tokio::test(start_paused = true)]
    async fn test_successful_click_waits_for_settle() {
        let mut backend = ClickOnly {
            outcome: || Ok(()),
            clicks: 0,
        };
        let start = Instant::now();
        click_and_settle(&mut backend, "button", 0, CLICK, SETTLE)
            .await
            .unwrap();
        assert!(start.elapsed() >= SETTLE);
        assert_eq!(backend.clicks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_click_returns_without_settling() {
        let mut backend = ClickOnly {
            outcome: || {
                Err(BackendError::ElementNotInteractable {
                    reason: "covered".into(),
                })
            },
            clicks: 0,
        };
        let start = Instant::now();
        let err = click_and_settle(&mut backend, "button", 0, CLICK, SETTLE)
            .await
            .unwrap_err();
        assert!(matches!(err, InteractionError::Failed(_)));
        assert!(start.elapsed() < SETTLE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_timeout_maps_to_interaction_timeout() {
        let mut backend = ClickOnly {
            outcome: || {
                Err(BackendError::Timeout {
                    operation: "waiting for element 0".into(),
                    timeout_ms: 2000,
                })
            },
            clicks: 0,
        };
        let start = Instant::now();
        let err = click_and_settle(&mut backend, "button", 0, CLICK, SETTLE)
            .await
            .unwrap_err();
        assert!(matches!(err, InteractionError::Timeout { timeout_ms: 2000 }));
        assert!(start.elapsed() < SETTLE);
    }
}
