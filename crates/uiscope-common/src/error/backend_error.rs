use thiserror::Error;

/// Errors raised by automation backends.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend not ready")]
    NotReady,

    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Failed to close browser: {0}")]
    Close(String),

    #[error("Navigation error: {0}")]
    Navigation(String),

    #[error("No element matches '{selector}' at index {index}")]
    ElementNotFound { selector: String, index: usize },

    #[error("Element not interactable: {reason}")]
    ElementNotInteractable { reason: String },

    #[error("Timed out after {timeout_ms}ms: {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Script error: {0}")]
    ScriptError(String),

    #[error("Accessibility snapshot failed: {0}")]
    Snapshot(String),

    #[error("Screenshot failed: {0}")]
    Screenshot(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Whether the failure concerns a single element rather than the session.
    pub fn is_element_scoped(&self) -> bool {
        matches!(
            self,
            BackendError::ElementNotFound { .. }
                | BackendError::ElementNotInteractable { .. }
                | BackendError::Timeout { .. }
                | BackendError::ScriptError(_)
        )
    }
}
