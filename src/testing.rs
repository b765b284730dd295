//! Test doubles shared by unit tests

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::selector::SelectorSpec;
use crate::session::BrowserCookie;
use crate::traits::PageDriver;

/// Wraps a driver and counts element lookups per selector
pub struct CountingDriver<D> {
    inner: D,
    lookups: Mutex<HashMap<String, usize>>,
}

impl<D: PageDriver> CountingDriver<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            lookups: Mutex::new(HashMap::new()),
        }
    }

    /// `find_one` plus `find_all` calls made with `selector` (prefixed form)
    pub fn lookups(&self, selector: &str) -> usize {
        self.lookups.lock().unwrap().get(selector).copied().unwrap_or(0)
    }

    fn record(&self, selector: &SelectorSpec) {
        *self
            .lookups
            .lock()
            .unwrap()
            .entry(selector.to_string())
            .or_default() += 1;
    }
}

#[async_trait]
impl<D: PageDriver> PageDriver for CountingDriver<D> {
    type Element = D::Element;

    async fn navigate(&self, url: &str) -> Result<()> {
        self.inner.navigate(url).await
    }

    async fn current_url(&self) -> Result<String> {
        self.inner.current_url().await
    }

    async fn find_one(
        &self,
        selector: &SelectorSpec,
        scope: Option<&Self::Element>,
    ) -> Result<Option<Self::Element>> {
        self.record(selector);
        self.inner.find_one(selector, scope).await
    }

    async fn find_all(
        &self,
        selector: &SelectorSpec,
        scope: Option<&Self::Element>,
    ) -> Result<Vec<Self::Element>> {
        self.record(selector);
        self.inner.find_all(selector, scope).await
    }

    async fn text(&self, element: &Self::Element) -> Result<String> {
        self.inner.text(element).await
    }

    async fn set_cookie(&self, cookie: &BrowserCookie) -> Result<()> {
        self.inner.set_cookie(cookie).await
    }

    async fn cookies(&self) -> Result<Vec<BrowserCookie>> {
        self.inner.cookies().await
    }

    async fn execute_script(&self, script: &str) -> Result<serde_json::Value> {
        self.inner.execute_script(script).await
    }

    async fn page_title(&self) -> Result<String> {
        self.inner.page_title().await
    }

    async fn page_source_len(&self) -> Result<usize> {
        self.inner.page_source_len().await
    }
}
