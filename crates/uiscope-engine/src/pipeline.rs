//! The analysis run: one browser session, up to `max_clicks` candidates,
//! one annotation per successfully clicked element.

use crate::backend::{Backend, BackendError};
use crate::config::PipelineConfig;
use crate::describe::describe;
use crate::diff::DiffResult;
use crate::driver::click_and_settle;
use crate::snapshot;
use crate::synthesis::{Screenshots, Synthesizer};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uiscope_common::protocol::{Annotation, Coordinates, Rect};
use uiscope_common::selectors::interactive_selector;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Browser session failed: {0}")]
    Resource(String),
}

/// Produces a fresh, unlaunched backend for every run.
pub trait BackendFactory: Send + Sync {
    fn create(&self) -> Box<dyn Backend>;
}

impl<F> BackendFactory for F
where
    F: Fn() -> Box<dyn Backend> + Send + Sync,
{
    fn create(&self) -> Box<dyn Backend> {
        self()
    }
}

/// Lifecycle of one candidate element within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateState {
    Discovered,
    Described,
    Clicked,
    Skipped,
    Snapshotted,
    Diffed,
    Annotated,
}

impl fmt::Display for CandidateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CandidateState::Discovered => "discovered",
            CandidateState::Described => "described",
            CandidateState::Clicked => "clicked",
            CandidateState::Skipped => "skipped",
            CandidateState::Snapshotted => "snapshotted",
            CandidateState::Diffed => "diffed",
            CandidateState::Annotated => "annotated",
        };
        f.write_str(name)
    }
}

fn transition(index: usize, state: CandidateState) {
    debug!(candidate = index, state = %state, "candidate state");
}

/// Trimmed URL, or a validation error when nothing is left.
pub fn validate_url(url: &str) -> Result<&str, AnalysisError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(AnalysisError::Validation("url is required".into()));
    }
    Ok(url)
}

#[derive(Clone)]
pub struct Analyzer {
    config: PipelineConfig,
    synthesizer: Synthesizer,
    backends: Arc<dyn BackendFactory>,
}

impl Analyzer {
    pub fn new(
        config: PipelineConfig,
        synthesizer: Synthesizer,
        backends: Arc<dyn BackendFactory>,
    ) -> Self {
        Self {
            config,
            synthesizer,
            backends,
        }
    }

    /// Analyze `url` in a dedicated browser session.
    ///
    /// The session is closed on every exit path. Only validation, navigation
    /// and session failures are returned; per-element problems shrink the
    /// result instead.
    pub async fn analyze(&self, url: &str) -> Result<Vec<Annotation>, AnalysisError> {
        let url = validate_url(url)?;
        let mut backend = self.backends.create();

        if let Err(e) = backend.launch().await {
            close_quietly(backend.as_mut()).await;
            return Err(AnalysisError::Resource(e.to_string()));
        }

        let result = self.run(backend.as_mut(), url).await;
        close_quietly(backend.as_mut()).await;

        match &result {
            Ok(annotations) => info!("Analyzed {}: {} annotations", url, annotations.len()),
            Err(e) => warn!("Analysis of {} failed: {}", url, e),
        }
        result
    }

    async fn run(&self, backend: &mut dyn Backend, url: &str) -> Result<Vec<Annotation>, AnalysisError> {
        let timeout = self.config.navigation_timeout();
        let navigation = tokio::time::timeout(timeout, backend.navigate(url, timeout))
            .await
            .map_err(|_| {
                AnalysisError::Navigation(format!(
                    "{} did not load within {}ms",
                    url, self.config.navigation_timeout_ms
                ))
            })?
            .map_err(|e| AnalysisError::Navigation(e.to_string()))?;
        info!("Loaded {} ({})", navigation.url, navigation.title);

        let selector = interactive_selector();
        let count = backend
            .count_matching(&selector)
            .await
            .map_err(|e| AnalysisError::Resource(e.to_string()))?;
        let limit = count.min(self.config.max_clicks);
        info!("Found {} interactive elements, visiting {}", count, limit);

        let mut annotations = Vec::with_capacity(limit);
        for index in 0..limit {
            if let Some(annotation) = self.visit(backend, &selector, index).await? {
                annotations.push(annotation);
            }
        }
        Ok(annotations)
    }

    /// Process the `index`-th candidate. `Ok(None)` means it was skipped.
    async fn visit(
        &self,
        backend: &mut dyn Backend,
        selector: &str,
        index: usize,
    ) -> Result<Option<Annotation>, AnalysisError> {
        transition(index, CandidateState::Discovered);

        let inspected = match backend.inspect_element(selector, index).await {
            Ok(inspected) => inspected,
            Err(e) if e.is_element_scoped() => {
                debug!("Candidate {} could not be inspected: {}", index, e);
                transition(index, CandidateState::Skipped);
                return Ok(None);
            }
            Err(e) => return Err(AnalysisError::Resource(e.to_string())),
        };
        let descriptor = describe(&inspected);
        transition(index, CandidateState::Described);

        let screenshot_before = self.screenshot(backend, descriptor.coordinates).await;
        let before = snapshot::capture(backend).await;

        if let Err(e) = click_and_settle(
            backend,
            selector,
            index,
            self.config.click_timeout(),
            self.config.settle_delay(),
        )
        .await
        {
            debug!("Skipping {} ({}): {}", descriptor.selector, descriptor.label, e);
            transition(index, CandidateState::Skipped);
            return Ok(None);
        }
        transition(index, CandidateState::Clicked);

        let screenshot_after = self.screenshot(backend, descriptor.coordinates).await;
        let after = snapshot::capture(backend).await;
        transition(index, CandidateState::Snapshotted);

        let diff = DiffResult::compute(&before, &after);
        transition(index, CandidateState::Diffed);

        let screenshots = Screenshots {
            before: screenshot_before,
            after: screenshot_after,
        };
        let annotation = self
            .synthesizer
            .synthesize(&descriptor, &diff, screenshots)
            .await;
        transition(index, CandidateState::Annotated);
        Ok(Some(annotation))
    }

    async fn screenshot(&self, backend: &mut dyn Backend, center: Coordinates) -> Option<String> {
        if !self.config.capture_screenshots {
            return None;
        }
        let clip = Rect::around(center, self.config.screenshot_margin_px);
        match backend.screenshot_region(clip).await {
            Ok(png) => Some(STANDARD.encode(png)),
            Err(BackendError::NotSupported(_)) => None,
            Err(e) => {
                debug!("Screenshot at ({}, {}) failed: {}", center.x, center.y, e);
                None
            }
        }
    }
}

async fn close_quietly(backend: &mut dyn Backend) {
    if let Err(e) = backend.close().await {
        warn!("Failed to close browser session: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert_eq!(validate_url("  https://a.io ").unwrap(), "https://a.io");
        assert!(matches!(validate_url(""), Err(AnalysisError::Validation(_))));
        assert!(matches!(validate_url("   "), Err(AnalysisError::Validation(_))));
    }

    #[test]
    fn test_state_names() {
        assert_eq!(CandidateState::Skipped.to_string(), "skipped");
        assert_eq!(CandidateState::Annotated.to_string(), "annotated");
    }
}
