//! Annotation synthesis: a best-effort model call with a deterministic fallback.

mod openai;
pub mod prompt;

pub use openai::OpenAiModel;

use crate::config::ModelConfig;
use crate::diff::DiffResult;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uiscope_common::protocol::{Annotation, ElementDescriptor};

/// Change analysis used when the diff is empty and no model answered.
pub const GENERIC_CHANGE: &str = "UI state changed (see diff).";

pub const FALLBACK_STATE_BEFORE: &str =
    "UI state before interaction (see accessibility snapshot).";

pub const FALLBACK_STATE_AFTER: &str = "UI state after interaction (see accessibility snapshot).";

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),
}

/// The descriptive fields a model is trusted to produce.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelAnnotation {
    pub website_section: String,
    pub state_before: String,
    pub state_after: String,
    pub change_analysis: String,
    pub element_aria_label: String,
}

#[async_trait]
pub trait AnnotationModel: Send + Sync {
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<ModelAnnotation, SynthesisError>;
}

/// Base64 PNG captures around the element, when taken.
#[derive(Debug, Clone, Default)]
pub struct Screenshots {
    pub before: Option<String>,
    pub after: Option<String>,
}

#[derive(Clone, Default)]
pub struct Synthesizer {
    model: Option<Arc<dyn AnnotationModel>>,
}

impl Synthesizer {
    pub fn new(model: Arc<dyn AnnotationModel>) -> Self {
        Self { model: Some(model) }
    }

    pub fn fallback_only() -> Self {
        Self { model: None }
    }

    /// OpenAI-backed synthesizer when a key is available, fallback-only otherwise.
    pub fn from_config(config: &ModelConfig) -> Self {
        let Some(api_key) = config.resolve_api_key() else {
            info!("No model API key configured, annotations use the fallback text");
            return Self::fallback_only();
        };
        match OpenAiModel::new(api_key, config) {
            Ok(model) => Self::new(Arc::new(model)),
            Err(e) => {
                warn!("Model client unavailable, using fallback annotations: {}", e);
                Self::fallback_only()
            }
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Build the annotation for one interaction. Never fails.
    pub async fn synthesize(
        &self,
        descriptor: &ElementDescriptor,
        diff: &DiffResult,
        screenshots: Screenshots,
    ) -> Annotation {
        let diff_text = diff.text();
        let generated = match &self.model {
            Some(model) => {
                let prompt = prompt::build_prompt(descriptor, &diff_text);
                match model.generate(&prompt, &prompt::annotation_schema()).await {
                    Ok(generated) => Some(generated),
                    Err(e) => {
                        warn!("Model annotation failed for {}: {}", descriptor.selector, e);
                        None
                    }
                }
            }
            None => None,
        };
        let fields = generated.unwrap_or_else(|| fallback(descriptor, &diff_text));

        Annotation {
            website_section: fields.website_section,
            state_before: fields.state_before,
            state_after: fields.state_after,
            change_analysis: fields.change_analysis,
            element_aria_label: fields.element_aria_label,
            element_selector: descriptor.selector.clone(),
            element_type: descriptor.tag_name.clone(),
            coordinates: descriptor.coordinates,
            screenshot_before: screenshots.before,
            screenshot_after: screenshots.after,
        }
    }
}

fn fallback(descriptor: &ElementDescriptor, diff_text: &str) -> ModelAnnotation {
    let change_analysis = if diff_text.is_empty() {
        GENERIC_CHANGE.to_string()
    } else {
        diff_text.to_string()
    };
    ModelAnnotation {
        website_section: descriptor.section.clone(),
        state_before: FALLBACK_STATE_BEFORE.to_string(),
        state_after: FALLBACK_STATE_AFTER.to_string(),
        change_analysis,
        element_aria_label: descriptor.label.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::LineChange;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uiscope_common::protocol::Coordinates;

    struct FixedModel {
        result: Result<ModelAnnotation, u16>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AnnotationModel for FixedModel {
        async fn generate(&self, prompt: &str, _schema: &Value) -> Result<ModelAnnotation, SynthesisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(prompt.contains("Analyze this UI interaction"));
            self.result.clone().map_err(|status| SynthesisError::Api {
                status,
                message: "boom".into(),
            })
        }
    }

    fn descriptor() -> ElementDescriptor {
        ElementDescriptor {
            label: "Subscribe".into(),
            section: "footer".into(),
            tag_name: "button".into(),
            coordinates: Coordinates { x: 5, y: 9 },
            selector: "button.cta".into(),
        }
    }

    fn generated() -> ModelAnnotation {
        ModelAnnotation {
            website_section: "Newsletter".into(),
            state_before: "Form idle".into(),
            state_after: "Thank-you message shown".into(),
            change_analysis: "A status message appeared".into(),
            element_aria_label: "Subscribe button".into(),
        }
    }

    #[tokio::test]
    async fn test_without_model_uses_diff_text() {
        let diff = DiffResult::from_changes(&[LineChange::Added("\"expanded\": true")]);
        let annotation = Synthesizer::fallback_only()
            .synthesize(&descriptor(), &diff, Screenshots::default())
            .await;
        assert_eq!(annotation.change_analysis, "+ \"expanded\": true");
        assert_eq!(annotation.website_section, "footer");
        assert_eq!(annotation.element_aria_label, "Subscribe");
        assert_eq!(annotation.state_before, FALLBACK_STATE_BEFORE);
        assert_eq!(annotation.state_after, FALLBACK_STATE_AFTER);
    }

    #[tokio::test]
    async fn test_empty_diff_uses_generic_literal() {
        let annotation = Synthesizer::fallback_only()
            .synthesize(&descriptor(), &DiffResult::default(), Screenshots::default())
            .await;
        assert_eq!(annotation.change_analysis, GENERIC_CHANGE);
    }

    #[tokio::test]
    async fn test_model_fields_are_kept_but_identity_is_local() {
        let model = Arc::new(FixedModel {
            result: Ok(generated()),
            calls: AtomicUsize::new(0),
        });
        let synthesizer = Synthesizer::new(model.clone());
        let screenshots = Screenshots {
            before: Some("YmVmb3Jl".into()),
            after: None,
        };
        let annotation = synthesizer
            .synthesize(&descriptor(), &DiffResult::default(), screenshots)
            .await;

        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        assert_eq!(annotation.state_after, "Thank-you message shown");
        assert_eq!(annotation.element_selector, "button.cta");
        assert_eq!(annotation.element_type, "button");
        assert_eq!(annotation.coordinates, Coordinates { x: 5, y: 9 });
        assert_eq!(annotation.screenshot_before.as_deref(), Some("YmVmb3Jl"));
        assert!(annotation.screenshot_after.is_none());
    }

    #[tokio::test]
    async fn test_model_failure_falls_back() {
        let synthesizer = Synthesizer::new(Arc::new(FixedModel {
            result: Err(503),
            calls: AtomicUsize::new(0),
        }));
        let annotation = synthesizer
            .synthesize(&descriptor(), &DiffResult::default(), Screenshots::default())
            .await;
        assert_eq!(annotation.change_analysis, GENERIC_CHANGE);
        assert_eq!(annotation.element_aria_label, "Subscribe");
    }

    #[test]
    fn test_from_config_without_key_is_fallback_only() {
        let config = ModelConfig {
            api_key: Some("   ".into()),
            ..ModelConfig::default()
        };
        assert!(!Synthesizer::from_config(&config).has_model());
        let keyed = ModelConfig {
            api_key: Some("sk-test".into()),
            ..ModelConfig::default()
        };
        assert!(Synthesizer::from_config(&keyed).has_model());
    }
}
