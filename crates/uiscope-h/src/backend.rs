use crate::cdp::CdpClient;
use crate::inject::{self, Actionability, ScrollOffset};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::accessibility::GetFullAxTreeParams;
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, Viewport};
use chromiumoxide::layout::Point;
use chromiumoxide::page::ScreenshotParams;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};
use uiscope_engine::backend::{Backend, BackendError, NavigationResult};
use uiscope_engine::config::BrowserConfig;
use uiscope_engine::protocol::{AxNodeRecord, InspectedElement, Rect};

/// Interval between actionability checks while waiting to click.
const ACTIONABILITY_POLL: Duration = Duration::from_millis(100);

pub struct HeadlessBackend {
    client: Option<CdpClient>,
    options: BrowserConfig,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::with_options(BrowserConfig::default())
    }

    pub fn with_options(options: BrowserConfig) -> Self {
        Self {
            client: None,
            options,
        }
    }

    fn page(&self) -> Result<&chromiumoxide::Page, BackendError> {
        self.client
            .as_ref()
            .map(|c| &c.page)
            .ok_or(BackendError::NotReady)
    }
}

/// Screenshot clips are in document space while element rects are viewport-relative.
fn document_clip(clip: Rect, offset: ScrollOffset) -> Viewport {
    Viewport {
        x: (clip.x + offset.x).max(0.0),
        y: (clip.y + offset.y).max(0.0),
        width: clip.width,
        height: clip.height,
        scale: 1.0,
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    async fn get_navigation_result(
        page: &chromiumoxide::Page,
    ) -> Result<NavigationResult, BackendError> {
        let title = page
            .get_title()
            .await
            .unwrap_or_default()
            .unwrap_or_default();
        let url = page
            .url()
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?
            .unwrap_or_default();
        Ok(NavigationResult { url, title })
    }
}

#[async_trait]
impl Backend for HeadlessBackend {
    async fn launch(&mut self) -> Result<(), BackendError> {
        info!("Launching Headless Backend (Chromium)...");
        let client = CdpClient::launch(&self.options).await?;
        self.client = Some(client);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        if let Some(client) = self.client.take() {
            client.close().await?;
        }
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.client.is_some()
    }

    async fn navigate(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> Result<NavigationResult, BackendError> {
        let page = self.page()?;

        info!("Navigating to: {}", url);
        match tokio::time::timeout(timeout, page.goto(url)).await {
            Err(_) => {
                return Err(BackendError::Timeout {
                    operation: format!("navigation to {}", url),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            Ok(Err(e)) => return Err(BackendError::Navigation(e.to_string())),
            Ok(Ok(_)) => {}
        }

        Self::get_navigation_result(page).await
    }

    async fn count_matching(&mut self, selector: &str) -> Result<usize, BackendError> {
        inject::count_matching(self.page()?, selector).await
    }

    async fn inspect_element(
        &mut self,
        selector: &str,
        index: usize,
    ) -> Result<InspectedElement, BackendError> {
        inject::inspect(self.page()?, selector, index)
            .await?
            .ok_or_else(|| BackendError::ElementNotFound {
                selector: selector.to_string(),
                index,
            })
    }

    async fn click_element(
        &mut self,
        selector: &str,
        index: usize,
        timeout: Duration,
    ) -> Result<(), BackendError> {
        let page = self.page()?;
        let deadline = Instant::now() + timeout;

        loop {
            let state = inject::check_actionable(page, selector, index).await?;
            match state {
                Actionability::Ready { x, y } => {
                    page.click(Point { x, y }).await.map_err(|e| {
                        BackendError::ElementNotInteractable {
                            reason: e.to_string(),
                        }
                    })?;
                    return Ok(());
                }
                Actionability::Missing => {
                    return Err(BackendError::ElementNotFound {
                        selector: selector.to_string(),
                        index,
                    });
                }
                other => {
                    if Instant::now() + ACTIONABILITY_POLL >= deadline {
                        return Err(BackendError::Timeout {
                            operation: format!("waiting for element {} ({})", index, other.reason()),
                            timeout_ms: timeout.as_millis() as u64,
                        });
                    }
                    debug!("Element {} not actionable yet: {}", index, other.reason());
                    tokio::time::sleep(ACTIONABILITY_POLL).await;
                }
            }
        }
    }

    async fn accessibility_tree(&mut self) -> Result<Vec<AxNodeRecord>, BackendError> {
        let page = self.page()?;
        let response = page
            .execute(GetFullAxTreeParams::default())
            .await
            .map_err(|e| BackendError::Snapshot(e.to_string()))?;
        let nodes = serde_json::to_value(&response.result.nodes)?;
        Ok(serde_json::from_value(nodes)?)
    }

    async fn screenshot_region(&mut self, clip: Rect) -> Result<Vec<u8>, BackendError> {
        let page = self.page()?;
        let offset = inject::scroll_offset(page).await?;
        let viewport = document_clip(clip, offset);
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .clip(viewport)
            .build();
        page.screenshot(params)
            .await
            .map_err(|e| BackendError::Screenshot(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f64, y: f64) -> Rect {
        Rect {
            x,
            y,
            width: 100.0,
            height: 100.0,
        }
    }

    #[test]
    fn test_clip_is_shifted_by_scroll_offset() {
        let viewport = document_clip(rect(20.0, 350.0), ScrollOffset { x: 0.0, y: 1200.0 });
        assert_eq!(viewport.x, 20.0);
        assert_eq!(viewport.y, 1550.0);
        assert_eq!(viewport.width, 100.0);
        assert_eq!(viewport.height, 100.0);
    }

    #[test]
    fn test_clip_is_clamped_after_shifting() {
        let viewport = document_clip(rect(-50.0, -30.0), ScrollOffset { x: 10.0, y: 400.0 });
        assert_eq!(viewport.x, 0.0);
        assert_eq!(viewport.y, 370.0);

        let viewport = document_clip(rect(-50.0, -30.0), ScrollOffset::default());
        assert_eq!((viewport.x, viewport.y), (0.0, 0.0));
    }
}
