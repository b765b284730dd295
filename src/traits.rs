//! Traits and interfaces for driver-agnostic extraction

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::Instant;

use crate::selector::SelectorSpec;
use crate::session::BrowserCookie;

/// Interval between probes in [`PageDriver::wait_for`]
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Capability set the extraction engine needs from a rendering surface.
///
/// Implemented by the live Chromium driver and by the static snapshot page,
/// so every extraction step can run against a fake document. All methods
/// report failures as errors; the extraction layer decides whether an error
/// means "not found".
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Handle to an element in the current document
    type Element: Send + Sync;

    /// Navigate the session to `url`
    async fn navigate(&self, url: &str) -> Result<()>;

    /// URL currently loaded, after any redirects
    async fn current_url(&self) -> Result<String>;

    /// First element matching `selector` within `scope` (the document when `None`)
    ///
    /// # Returns
    /// * `Result<Option<Self::Element>>` - `None` when nothing matches
    async fn find_one(
        &self,
        selector: &SelectorSpec,
        scope: Option<&Self::Element>,
    ) -> Result<Option<Self::Element>>;

    /// Every element matching `selector` within `scope`, in document order
    async fn find_all(
        &self,
        selector: &SelectorSpec,
        scope: Option<&Self::Element>,
    ) -> Result<Vec<Self::Element>>;

    /// Text content of an element, with whitespace runs collapsed
    async fn text(&self, element: &Self::Element) -> Result<String>;

    /// Add a cookie to the session for the current domain context
    async fn set_cookie(&self, cookie: &BrowserCookie) -> Result<()>;

    /// Cookies visible to the session
    async fn cookies(&self) -> Result<Vec<BrowserCookie>>;

    /// Run a script in the page and return its JSON result
    async fn execute_script(&self, script: &str) -> Result<serde_json::Value>;

    /// Document title as reported by the browser
    async fn page_title(&self) -> Result<String>;

    /// Length of the current page source, in bytes
    async fn page_source_len(&self) -> Result<usize>;

    /// Wait up to `timeout` for `selector` to match, probing cooperatively
    ///
    /// Lookup errors count as "not yet present".
    async fn wait_for(
        &self,
        selector: &SelectorSpec,
        timeout: Duration,
    ) -> Option<Self::Element> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(Some(element)) = self.find_one(selector, None).await {
                return Some(element);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            tokio::time::sleep(DEFAULT_POLL_INTERVAL.min(deadline - now)).await;
        }
    }
}
