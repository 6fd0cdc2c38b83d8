use async_trait::async_trait;
use std::time::Duration;
pub use uiscope_common::error::backend_error::BackendError;
use uiscope_common::protocol::{AxNodeRecord, InspectedElement, Rect};

#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub url: String,
    pub title: String,
}

/// The capability set the analysis pipeline needs from a browser.
///
/// Elements are addressed by `(selector, index)` and re-resolved on every call,
/// so a handle never outlives a single operation.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Launch an isolated browsing session.
    async fn launch(&mut self) -> Result<(), BackendError>;

    /// Close the session and clean up its resources.
    async fn close(&mut self) -> Result<(), BackendError>;

    /// Check if the backend is ready to accept commands.
    async fn is_ready(&self) -> bool;

    /// Navigate to `url`, failing if the document does not load within `timeout`.
    async fn navigate(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> Result<NavigationResult, BackendError>;

    /// Number of elements currently matching `selector`, in document order.
    async fn count_matching(&mut self, selector: &str) -> Result<usize, BackendError>;

    /// Inspect the `index`-th match of `selector` without side effects.
    async fn inspect_element(
        &mut self,
        selector: &str,
        index: usize,
    ) -> Result<InspectedElement, BackendError>;

    /// Click the `index`-th match of `selector`, giving up after `timeout`.
    async fn click_element(
        &mut self,
        selector: &str,
        index: usize,
        timeout: Duration,
    ) -> Result<(), BackendError>;

    /// Raw accessibility tree of the current document.
    async fn accessibility_tree(&mut self) -> Result<Vec<AxNodeRecord>, BackendError>;

    /// PNG capture of a region of the viewport.
    async fn screenshot_region(&mut self, clip: Rect) -> Result<Vec<u8>, BackendError> {
        let _ = clip;
        Err(BackendError::NotSupported("screenshot_region".into()))
    }
}
