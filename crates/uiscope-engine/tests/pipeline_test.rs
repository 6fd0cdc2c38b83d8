use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uiscope_engine::backend::{Backend, BackendError, NavigationResult};
use uiscope_engine::config::PipelineConfig;
use uiscope_engine::diff::DiffResult;
use uiscope_engine::protocol::{AxNodeRecord, InspectedElement, InspectedNode, Rect};
use uiscope_engine::snapshot::AccessibilitySnapshot;
use uiscope_engine::synthesis::{Synthesizer, GENERIC_CHANGE};
use uiscope_engine::{AnalysisError, Analyzer, BackendFactory};

#[derive(Debug, Clone, Copy, PartialEq)]
enum ClickBehavior {
    Succeed,
    Occluded,
    Hang,
}

#[derive(Debug, Clone)]
struct Script {
    count: usize,
    fail_launch: bool,
    fail_navigation: bool,
    hang_navigation: bool,
    click: ClickBehavior,
    snapshot_fails: bool,
    expand_on_click: bool,
    missing: Vec<usize>,
    fatal_inspect: bool,
    screenshot: Option<Vec<u8>>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            count: 1,
            fail_launch: false,
            fail_navigation: false,
            hang_navigation: false,
            click: ClickBehavior::Succeed,
            snapshot_fails: false,
            expand_on_click: false,
            missing: Vec::new(),
            fatal_inspect: false,
            screenshot: None,
        }
    }
}

#[derive(Debug, Default)]
struct Log {
    created: usize,
    launched: usize,
    closed: usize,
    clicks: Vec<usize>,
    screenshots: usize,
}

struct MockBackend {
    script: Script,
    log: Arc<Mutex<Log>>,
    expanded: bool,
}

fn ax(id: &str, parent: Option<&str>, children: &[&str], role: &str, name: &str) -> serde_json::Value {
    json!({
        "nodeId": id,
        "role": { "type": "role", "value": role },
        "name": { "type": "computedString", "value": name },
        "parentId": parent,
        "childIds": children,
        "properties": [{ "name": "focusable", "value": { "type": "booleanOrUndefined", "value": true } }]
    })
}

fn page_tree(expanded: bool) -> Vec<AxNodeRecord> {
    let mut menu = ax("2", Some("1"), &[], "button", "Menu");
    if expanded {
        menu["properties"]
            .as_array_mut()
            .unwrap()
            .push(json!({ "name": "expanded", "value": { "type": "booleanOrUndefined", "value": true } }));
    }
    let root = json!({
        "nodeId": "1",
        "role": { "type": "internalRole", "value": "RootWebArea" },
        "name": { "type": "computedString", "value": "Demo" },
        "childIds": ["2"]
    });
    serde_json::from_value(json!([root, menu])).unwrap()
}

fn inspected(index: usize) -> InspectedElement {
    let button = InspectedNode {
        tag_name: "button".into(),
        attributes: HashMap::from([("id".to_string(), format!("btn-{}", index))]),
        text: format!("Button {}", index),
    };
    let body = InspectedNode {
        tag_name: "body".into(),
        ..InspectedNode::default()
    };
    InspectedElement {
        ancestry: vec![button, body],
        labelled_by: HashMap::new(),
        rect: Rect {
            x: 0.0,
            y: index as f64 * 20.0,
            width: 80.0,
            height: 20.0,
        },
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn launch(&mut self) -> Result<(), BackendError> {
        self.log.lock().unwrap().launched += 1;
        if self.script.fail_launch {
            return Err(BackendError::Launch("no chromium".into()));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        self.log.lock().unwrap().closed += 1;
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        true
    }

    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<NavigationResult, BackendError> {
        if self.script.hang_navigation {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.script.fail_navigation {
            return Err(BackendError::Navigation("net::ERR_NAME_NOT_RESOLVED".into()));
        }
        Ok(NavigationResult {
            url: url.to_string(),
            title: "Demo".into(),
        })
    }

    async fn count_matching(&mut self, _selector: &str) -> Result<usize, BackendError> {
        Ok(self.script.count)
    }

    async fn inspect_element(&mut self, selector: &str, index: usize) -> Result<InspectedElement, BackendError> {
        if self.script.fatal_inspect {
            return Err(BackendError::Other("target crashed".into()));
        }
        if self.script.missing.contains(&index) {
            return Err(BackendError::ElementNotFound {
                selector: selector.to_string(),
                index,
            });
        }
        Ok(inspected(index))
    }

    async fn click_element(&mut self, _selector: &str, index: usize, _timeout: Duration) -> Result<(), BackendError> {
        self.log.lock().unwrap().clicks.push(index);
        match self.script.click {
            ClickBehavior::Succeed => {
                if self.script.expand_on_click {
                    self.expanded = true;
                }
                Ok(())
            }
            ClickBehavior::Occluded => Err(BackendError::ElementNotInteractable {
                reason: "covered by another element".into(),
            }),
            ClickBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }

    async fn accessibility_tree(&mut self) -> Result<Vec<AxNodeRecord>, BackendError> {
        if self.script.snapshot_fails {
            return Err(BackendError::Snapshot("detached".into()));
        }
        Ok(page_tree(self.expanded))
    }

    async fn screenshot_region(&mut self, _clip: Rect) -> Result<Vec<u8>, BackendError> {
        self.log.lock().unwrap().screenshots += 1;
        self.script
            .screenshot
            .clone()
            .ok_or_else(|| BackendError::Screenshot("blank".into()))
    }
}

fn fast_config() -> PipelineConfig {
    PipelineConfig {
        settle_ms: 0,
        ..PipelineConfig::default()
    }
}

fn build(script: Script, config: PipelineConfig) -> (Analyzer, Arc<Mutex<Log>>) {
    let log = Arc::new(Mutex::new(Log::default()));
    let shared = log.clone();
    let factory: Arc<dyn BackendFactory> = Arc::new(move || -> Box<dyn Backend> {
        shared.lock().unwrap().created += 1;
        Box::new(MockBackend {
            script: script.clone(),
            log: shared.clone(),
            expanded: false,
        })
    });
    (Analyzer::new(config, Synthesizer::fallback_only(), factory), log)
}

#[tokio::test]
async fn test_twenty_candidates_yield_fifteen_clicks_in_order() {
    let script = Script {
        count: 20,
        ..Script::default()
    };
    let (analyzer, log) = build(script, fast_config());
    let annotations = analyzer.analyze("https://example.com").await.unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.clicks, (0..15).collect::<Vec<_>>());
    assert_eq!(annotations.len(), 15);
    assert_eq!(annotations[0].element_selector, "#btn-0");
    assert_eq!(annotations[14].element_aria_label, "Button 14");
    assert_eq!(log.closed, 1);
}

#[tokio::test]
async fn test_fewer_candidates_than_limit() {
    let script = Script {
        count: 3,
        missing: vec![1],
        ..Script::default()
    };
    let (analyzer, log) = build(script, fast_config());
    let annotations = analyzer.analyze("https://example.com").await.unwrap();

    assert!(annotations.len() <= 3);
    assert_eq!(annotations.len(), 2);
    assert_eq!(log.lock().unwrap().clicks, vec![0, 2]);
}

#[tokio::test]
async fn test_occluded_button_yields_empty_success() {
    let script = Script {
        click: ClickBehavior::Occluded,
        ..Script::default()
    };
    let (analyzer, log) = build(script, fast_config());
    let annotations = analyzer.analyze("https://example.com").await.unwrap();
    assert!(annotations.is_empty());
    assert_eq!(log.lock().unwrap().clicks, vec![0]);
}

#[tokio::test(start_paused = true)]
async fn test_click_over_budget_is_skipped() {
    let script = Script {
        count: 2,
        click: ClickBehavior::Hang,
        ..Script::default()
    };
    let (analyzer, log) = build(script, PipelineConfig::default());
    let annotations = analyzer.analyze("https://example.com").await.unwrap();
    assert!(annotations.is_empty());
    let log = log.lock().unwrap();
    assert_eq!(log.clicks, vec![0, 1]);
    assert_eq!(log.closed, 1);
}

#[tokio::test]
async fn test_identical_snapshots_use_generic_literal() {
    let (analyzer, _log) = build(Script::default(), fast_config());
    let annotations = analyzer.analyze("https://example.com").await.unwrap();
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].change_analysis, GENERIC_CHANGE);
    assert_eq!(annotations[0].website_section, "page");
}

#[tokio::test]
async fn test_fallback_analysis_is_the_diff_text() {
    let script = Script {
        expand_on_click: true,
        ..Script::default()
    };
    let (analyzer, _log) = build(script, fast_config());
    let annotations = analyzer.analyze("https://example.com").await.unwrap();

    let expected = DiffResult::compute(
        &AccessibilitySnapshot::from_nodes(&page_tree(false)),
        &AccessibilitySnapshot::from_nodes(&page_tree(true)),
    );
    assert!(!expected.is_empty());
    assert_eq!(annotations[0].change_analysis, expected.text());
    assert!(annotations[0].change_analysis.contains("+ "));
    assert!(annotations[0].change_analysis.contains("expanded"));
}

#[tokio::test]
async fn test_snapshot_failure_degrades_to_sentinel() {
    let script = Script {
        snapshot_fails: true,
        expand_on_click: true,
        ..Script::default()
    };
    let (analyzer, _log) = build(script, fast_config());
    let annotations = analyzer.analyze("https://example.com").await.unwrap();
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].change_analysis, GENERIC_CHANGE);
}

#[tokio::test]
async fn test_navigation_failure_is_fatal_and_closes() {
    let script = Script {
        fail_navigation: true,
        ..Script::default()
    };
    let (analyzer, log) = build(script, fast_config());
    let result = analyzer.analyze("https://nowhere.invalid").await;
    assert!(matches!(result, Err(AnalysisError::Navigation(_))));
    let log = log.lock().unwrap();
    assert_eq!(log.closed, 1);
    assert!(log.clicks.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_navigation_timeout_is_fatal() {
    let script = Script {
        hang_navigation: true,
        ..Script::default()
    };
    let (analyzer, log) = build(script, PipelineConfig::default());
    match analyzer.analyze("https://slow.example").await {
        Err(AnalysisError::Navigation(message)) => assert!(message.contains("30000ms")),
        other => panic!("Expected navigation error, got {:?}", other.map(|a| a.len())),
    }
    assert_eq!(log.lock().unwrap().closed, 1);
}

#[tokio::test]
async fn test_launch_failure_is_resource_error() {
    let script = Script {
        fail_launch: true,
        ..Script::default()
    };
    let (analyzer, log) = build(script, fast_config());
    let result = analyzer.analyze("https://example.com").await;
    assert!(matches!(result, Err(AnalysisError::Resource(_))));
    assert_eq!(log.lock().unwrap().closed, 1);
}

#[tokio::test]
async fn test_session_level_inspect_failure_aborts() {
    let script = Script {
        count: 4,
        fatal_inspect: true,
        ..Script::default()
    };
    let (analyzer, log) = build(script, fast_config());
    let result = analyzer.analyze("https://example.com").await;
    assert!(matches!(result, Err(AnalysisError::Resource(_))));
    assert_eq!(log.lock().unwrap().closed, 1);
}

#[tokio::test]
async fn test_empty_url_never_opens_a_session() {
    let (analyzer, log) = build(Script::default(), fast_config());
    let result = analyzer.analyze("   ").await;
    assert!(matches!(result, Err(AnalysisError::Validation(_))));
    let log = log.lock().unwrap();
    assert_eq!(log.created, 0);
    assert_eq!(log.launched, 0);
}

#[tokio::test]
async fn test_screenshots_are_base64_encoded() {
    let script = Script {
        screenshot: Some(b"png".to_vec()),
        ..Script::default()
    };
    let (analyzer, log) = build(script, fast_config());
    let annotations = analyzer.analyze("https://example.com").await.unwrap();
    assert_eq!(annotations[0].screenshot_before.as_deref(), Some("cG5n"));
    assert_eq!(annotations[0].screenshot_after.as_deref(), Some("cG5n"));
    assert_eq!(log.lock().unwrap().screenshots, 2);
}

#[tokio::test]
async fn test_failed_or_disabled_screenshots_are_omitted() {
    let (analyzer, _log) = build(Script::default(), fast_config());
    let annotations = analyzer.analyze("https://example.com").await.unwrap();
    assert!(annotations[0].screenshot_before.is_none());

    let script = Script {
        screenshot: Some(b"png".to_vec()),
        ..Script::default()
    };
    let config = PipelineConfig {
        capture_screenshots: false,
        ..fast_config()
    };
    let (analyzer, log) = build(script, config);
    let annotations = analyzer.analyze("https://example.com").await.unwrap();
    assert!(annotations[0].screenshot_after.is_none());
    assert_eq!(log.lock().unwrap().screenshots, 0);
}
