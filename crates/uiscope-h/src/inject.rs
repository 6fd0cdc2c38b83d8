use chromiumoxide::Page;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use uiscope_engine::backend::BackendError;
use uiscope_engine::protocol::InspectedElement;

const INSPECT_JS: &str = include_str!("js/inspect.js");
const ACTIONABLE_JS: &str = include_str!("js/actionable.js");

/// Default timeout for JavaScript evaluation (10 seconds).
/// This prevents hanging when dialogs (alert/confirm/prompt) block the JS thread.
const EVAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum retries for context errors during page navigation.
const MAX_CONTEXT_RETRIES: u32 = 10;

/// Delay between retries when context is not found (page navigating).
const CONTEXT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Check if an error indicates the page context is unavailable (e.g., during navigation).
fn is_context_error(err: &str) -> bool {
    err.contains("Cannot find context")
        || err.contains("Execution context was destroyed")
        || err.contains("-32000")
}

/// Whether a candidate can receive a pointer click right now.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Actionability {
    Missing,
    Hidden,
    Occluded,
    Ready { x: f64, y: f64 },
}

impl Actionability {
    pub fn reason(&self) -> &'static str {
        match self {
            Actionability::Missing => "detached",
            Actionability::Hidden => "not visible",
            Actionability::Occluded => "covered by another element",
            Actionability::Ready { .. } => "ready",
        }
    }
}

/// Call a function-expression script with `(selector, index)`.
fn call_with_target(script: &str, selector: &str, index: usize) -> Result<String, BackendError> {
    let selector = serde_json::to_string(selector)?;
    Ok(format!("{}({}, {})", script.trim(), selector, index))
}

pub async fn count_matching(page: &Page, selector: &str) -> Result<usize, BackendError> {
    let selector = serde_json::to_string(selector)?;
    let expression = format!("document.querySelectorAll({}).length", selector);
    evaluate_json(page, &expression).await
}

/// Read-only capture of the `index`-th match, `None` when it no longer exists.
pub async fn inspect(
    page: &Page,
    selector: &str,
    index: usize,
) -> Result<Option<InspectedElement>, BackendError> {
    let expression = call_with_target(INSPECT_JS, selector, index)?;
    evaluate_json(page, &expression).await
}

/// Scroll the candidate into view and report whether its center is clickable.
pub async fn check_actionable(
    page: &Page,
    selector: &str,
    index: usize,
) -> Result<Actionability, BackendError> {
    let expression = call_with_target(ACTIONABLE_JS, selector, index)?;
    evaluate_json(page, &expression).await
}

/// Document scroll position of the top-level viewport, in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct ScrollOffset {
    pub x: f64,
    pub y: f64,
}

pub async fn scroll_offset(page: &Page) -> Result<ScrollOffset, BackendError> {
    evaluate_json(page, "({ x: window.scrollX, y: window.scrollY })").await
}

/// Evaluate `expression` and deserialize its by-value result, retrying while the
/// execution context is being replaced.
pub async fn evaluate_json<T: DeserializeOwned>(
    page: &Page,
    expression: &str,
) -> Result<T, BackendError> {
    let mut last_error = None;

    for attempt in 0..MAX_CONTEXT_RETRIES {
        match evaluate_with_timeout(page, expression).await {
            Ok(value) => return serde_json::from_value(value).map_err(BackendError::from),
            Err(EvalError::Timeout) => {
                return Err(BackendError::Timeout {
                    operation: "script evaluation (possibly blocked by a dialog)".into(),
                    timeout_ms: EVAL_TIMEOUT.as_millis() as u64,
                });
            }
            Err(EvalError::Context(err_str)) => {
                tracing::debug!(
                    "Context error during evaluation (attempt {}/{}), retrying...",
                    attempt + 1,
                    MAX_CONTEXT_RETRIES
                );
                last_error = Some(err_str);
                tokio::time::sleep(CONTEXT_RETRY_DELAY).await;
            }
            Err(EvalError::Other(err_str)) => {
                return Err(BackendError::ScriptError(err_str));
            }
        }
    }

    Err(BackendError::ScriptError(last_error.unwrap_or_else(|| {
        "Evaluation failed after retries".to_string()
    })))
}

enum EvalError {
    Timeout,
    Context(String),
    Other(String),
}

async fn evaluate_with_timeout(
    page: &Page,
    expression: &str,
) -> Result<serde_json::Value, EvalError> {
    let eval_result = tokio::time::timeout(EVAL_TIMEOUT, page.evaluate(expression)).await;

    match eval_result {
        Err(_) => Err(EvalError::Timeout),
        Ok(Err(e)) => {
            let err_str = e.to_string();
            if is_context_error(&err_str) {
                Err(EvalError::Context(err_str))
            } else {
                Err(EvalError::Other(err_str))
            }
        }
        // `undefined` results carry no value; treat them as null.
        Ok(Ok(remote_object)) => Ok(remote_object
            .into_value::<serde_json::Value>()
            .unwrap_or(serde_json::Value::Null)),
    }
}
