//! Static HTML page driver.
//!
//! Serves a saved page source through [`PageDriver`] so the extraction
//! engine can run offline. CSS goes through `scraper`; XPath through a
//! location-path evaluator over the same tree. Scripts are not executed;
//! navigation only moves the reported URL (following any registered redirects).

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use super::xpath::XPath;
use crate::normalize::collapse_whitespace;
use crate::selector::{SelectorEngine, SelectorSpec};
use crate::session::BrowserCookie;
use crate::traits::PageDriver;

/// Element handle: position of the element in document order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotElement(usize);

#[derive(Debug, Default)]
struct SnapshotState {
    current_url: String,
    visited: Vec<String>,
    cookies: Vec<BrowserCookie>,
}

pub struct SnapshotPage {
    html: String,
    redirects: HashMap<String, String>,
    state: Mutex<SnapshotState>,
}

impl SnapshotPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            redirects: HashMap::new(),
            state: Mutex::new(SnapshotState {
                current_url: url.into(),
                ..SnapshotState::default()
            }),
        }
    }

    /// Navigating to `from` lands on `to`
    pub fn with_redirect(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.redirects.insert(from.into(), to.into());
        self
    }

    /// URLs passed to `navigate`, in order
    pub fn visited(&self) -> Vec<String> {
        self.lock().visited.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SnapshotState> {
        // A poisoned lock only means a test panicked mid-call; the state is still usable
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Parse the document and run `f` over its elements in document order.
    ///
    /// The parsed tree is not `Send`, so it never outlives this call.
    fn with_elements<T>(&self, f: impl FnOnce(&[ElementRef<'_>]) -> Result<T>) -> Result<T> {
        let document = Html::parse_document(&self.html);
        let elements: Vec<ElementRef<'_>> = document
            .tree
            .root()
            .descendants()
            .filter_map(ElementRef::wrap)
            .collect();
        f(&elements)
    }

    fn resolve(
        &self,
        selector: &SelectorSpec,
        scope: Option<&SnapshotElement>,
    ) -> Result<Vec<SnapshotElement>> {
        match selector.engine() {
            SelectorEngine::Css => self.resolve_css(selector, scope),
            SelectorEngine::XPath => self.resolve_xpath(selector, scope),
        }
    }

    fn resolve_xpath(
        &self,
        selector: &SelectorSpec,
        scope: Option<&SnapshotElement>,
    ) -> Result<Vec<SnapshotElement>> {
        let path = XPath::parse(selector.expression())
            .with_context(|| format!("invalid selector {selector}"))?;

        self.with_elements(|elements| {
            let scope = match scope {
                Some(SnapshotElement(index)) => Some(
                    *elements
                        .get(*index)
                        .ok_or_else(|| anyhow!("stale element handle {index}"))?,
                ),
                None => None,
            };
            Ok(path
                .select(elements, scope)
                .into_iter()
                .map(SnapshotElement)
                .collect())
        })
    }

    fn resolve_css(
        &self,
        selector: &SelectorSpec,
        scope: Option<&SnapshotElement>,
    ) -> Result<Vec<SnapshotElement>> {
        let css = Selector::parse(selector.expression())
            .map_err(|e| anyhow!("invalid selector {selector}: {e:?}"))?;

        self.with_elements(|elements| {
            let position = |found: &ElementRef<'_>| {
                elements.iter().position(|el| el == found)
            };

            let matches: Vec<SnapshotElement> = match scope {
                Some(SnapshotElement(index)) => {
                    let root = elements
                        .get(*index)
                        .ok_or_else(|| anyhow!("stale element handle {index}"))?;
                    root.select(&css)
                        .filter(|found| found != root)
                        .filter_map(|found| position(&found))
                        .map(SnapshotElement)
                        .collect()
                }
                None => elements
                    .iter()
                    .filter(|el| css.matches(el))
                    .filter_map(position)
                    .map(SnapshotElement)
                    .collect(),
            };
            Ok(matches)
        })
    }
}

#[async_trait]
impl PageDriver for SnapshotPage {
    type Element = SnapshotElement;

    async fn navigate(&self, url: &str) -> Result<()> {
        let landed = self.redirects.get(url).cloned().unwrap_or_else(|| url.to_string());
        let mut state = self.lock();
        state.visited.push(url.to_string());
        state.current_url = landed;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.lock().current_url.clone())
    }

    async fn find_one(
        &self,
        selector: &SelectorSpec,
        scope: Option<&Self::Element>,
    ) -> Result<Option<Self::Element>> {
        Ok(self.resolve(selector, scope)?.into_iter().next())
    }

    async fn find_all(
        &self,
        selector: &SelectorSpec,
        scope: Option<&Self::Element>,
    ) -> Result<Vec<Self::Element>> {
        self.resolve(selector, scope)
    }

    async fn text(&self, element: &Self::Element) -> Result<String> {
        self.with_elements(|elements| {
            let el = elements
                .get(element.0)
                .ok_or_else(|| anyhow!("stale element handle {}", element.0))?;
            Ok(collapse_whitespace(&el.text().collect::<String>()))
        })
    }

    async fn set_cookie(&self, cookie: &BrowserCookie) -> Result<()> {
        if cookie.name.trim().is_empty() {
            bail!("cookie name must not be empty");
        }
        let mut state = self.lock();
        state.cookies.retain(|existing| existing.name != cookie.name);
        state.cookies.push(cookie.clone());
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<BrowserCookie>> {
        Ok(self.lock().cookies.clone())
    }

    async fn execute_script(&self, _script: &str) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    async fn page_title(&self) -> Result<String> {
        let title = SelectorSpec::css("title");
        match self.find_one(&title, None).await? {
            Some(element) => self.text(&element).await,
            None => Ok(String::new()),
        }
    }

    async fn page_source_len(&self) -> Result<usize> {
        Ok(self.html.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><head><title>商品详情</title></head><body>
          <div class="list">
            <div class="item"><span class="name">红色</span></div>
            <div class="item"><span class="name">  蓝色
                 大号 </span></div>
          </div>
          <div class="item">outside</div>
        </body></html>"#;

    #[tokio::test]
    async fn resolves_css_in_document_and_scope() {
        let page = SnapshotPage::new("https://example.com", PAGE);
        let list = page
            .find_one(&SelectorSpec::css(".list"), None)
            .await
            .unwrap()
            .unwrap();

        let all = page.find_all(&SelectorSpec::css(".item"), None).await.unwrap();
        let scoped = page
            .find_all(&SelectorSpec::css(".item"), Some(&list))
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(scoped.len(), 2);

        let name = page
            .find_one(&SelectorSpec::css(".name"), Some(&scoped[1]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.text(&name).await.unwrap(), "蓝色 大号");
    }

    #[tokio::test]
    async fn resolves_xpath_in_document_and_scope() {
        let page = SnapshotPage::new("https://example.com", PAGE);
        let list = page
            .find_one(&SelectorSpec::xpath("//div[@class='list']"), None)
            .await
            .unwrap()
            .unwrap();

        let scoped = page
            .find_all(&SelectorSpec::xpath(".//div[contains(@class, 'item')]"), Some(&list))
            .await
            .unwrap();
        assert_eq!(scoped.len(), 2);
        assert_eq!(
            page.find_all(&SelectorSpec::css(".list .item"), None).await.unwrap(),
            scoped
        );

        let name = page
            .find_one(&SelectorSpec::xpath("./span"), Some(&scoped[0]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.text(&name).await.unwrap(), "红色");
    }

    #[tokio::test]
    async fn unsupported_xpath_and_invalid_css_are_errors() {
        let page = SnapshotPage::new("https://example.com", PAGE);
        assert!(page.find_one(&SelectorSpec::xpath("//div/following::*"), None).await.is_err());
        assert!(page.find_one(&SelectorSpec::css("div[["), None).await.is_err());
    }

    #[tokio::test]
    async fn reports_title_and_redirects() {
        let page = SnapshotPage::new("about:blank", PAGE)
            .with_redirect("https://detail.1688.com/offer/1.html", "https://login.1688.com/");
        assert_eq!(page.page_title().await.unwrap(), "商品详情");

        page.navigate("https://detail.1688.com/offer/1.html").await.unwrap();
        assert_eq!(page.current_url().await.unwrap(), "https://login.1688.com/");
        assert_eq!(page.page_source_len().await.unwrap(), PAGE.len());
    }
}
