//! Live page driver over Chromium via chromiumoxide.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    Cookie, CookieParam, CookieSameSite, TimeSinceEpoch,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BrowserSettings;
use crate::normalize::collapse_whitespace;
use crate::selector::{SelectorEngine, SelectorSpec};
use crate::session::BrowserCookie;
use crate::session::stealth;
use crate::traits::PageDriver;

/// Attribute that tags the hits of an element-scoped XPath lookup
const XPATH_MARK: &str = "data-listing-xpath";

/// One exclusively-owned browser session with a single working tab
pub struct ChromiumDriver {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    navigation_timeout: Duration,
    /// Distinguishes concurrent scoped XPath lookups
    xpath_token: AtomicU64,
}

impl ChromiumDriver {
    /// Launch a browser configured against automation detection
    pub async fn launch(settings: &BrowserSettings, navigation_timeout: Duration) -> Result<Self> {
        let (width, height) = stealth::WINDOW_SIZE;
        let mut builder = BrowserConfig::builder()
            .disable_default_args()
            .window_size(width, height)
            .args(stealth::launch_args());

        if settings.headless {
            builder = builder.args(stealth::headless_args());
        } else {
            builder = builder.with_head();
        }
        if let Some(binary) = &settings.binary {
            builder = builder.chrome_executable(binary);
        }
        if let Some(profile) = &settings.profile_dir {
            info!("Using browser profile {}", profile.display());
            builder = builder.user_data_dir(profile);
        }

        let config = builder
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch browser")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler event error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to open working tab")?;

        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
            stealth::NAVIGATOR_SCRIPT,
        ))
        .await
        .context("failed to install navigator script")?;

        info!(
            "Browser session ready ({})",
            if settings.headless { "headless" } else { "headed" }
        );

        Ok(Self {
            browser,
            page,
            handler,
            navigation_timeout,
            xpath_token: AtomicU64::new(0),
        })
    }

    /// Close the browser and stop its event handler
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
    }

    /// Evaluate `expr` with `element` as the context node.
    ///
    /// CDP only runs XPath from the document, so the hits are tagged in the
    /// page and looked up again by attribute, then untagged.
    async fn find_scoped_xpaths(&self, element: &Element, expr: &str) -> Result<Vec<Element>> {
        let token = self.xpath_token.fetch_add(1, Ordering::Relaxed);
        element
            .call_js_fn(scoped_xpath_script(expr, token)?, false)
            .await
            .with_context(|| format!("XPath {expr:?} failed in element scope"))?;

        let marked = format!("[{XPATH_MARK}=\"{token}\"]");
        let found = self.page.find_elements(marked.as_str()).await;

        let cleanup = format!(
            "document.querySelectorAll('{marked}').forEach(n => n.removeAttribute('{XPATH_MARK}'))"
        );
        if let Err(e) = self.page.evaluate(cleanup.as_str()).await {
            debug!("failed to clear XPath marks: {}", e);
        }
        Ok(found?)
    }
}

/// Function declaration run on the scope element that tags every element
/// the expression selects
fn scoped_xpath_script(expr: &str, token: u64) -> Result<String> {
    let expr = serde_json::to_string(expr)?;
    Ok(format!(
        "function() {{ \
            const hits = document.evaluate({expr}, this, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
            for (let i = 0; i < hits.snapshotLength; i++) {{ \
                const node = hits.snapshotItem(i); \
                if (node.nodeType === Node.ELEMENT_NODE) node.setAttribute('{XPATH_MARK}', '{token}'); \
            }} \
            return hits.snapshotLength; \
        }}"
    ))
}

fn to_cookie_param(cookie: &BrowserCookie) -> CookieParam {
    let mut param = CookieParam::new(cookie.name.clone(), cookie.value.clone());
    param.domain = cookie.domain.clone();
    param.path = cookie.path.clone();
    param.secure = cookie.secure;
    param.http_only = cookie.http_only;
    param.expires = cookie.expiry.map(TimeSinceEpoch::new);
    param.same_site = cookie
        .same_site
        .as_deref()
        .and_then(|value| match value.to_ascii_lowercase().as_str() {
            "strict" => Some(CookieSameSite::Strict),
            "lax" => Some(CookieSameSite::Lax),
            "none" => Some(CookieSameSite::None),
            _ => None,
        });
    param
}

fn from_cookie(cookie: Cookie) -> BrowserCookie {
    let same_site = cookie.same_site.map(|value| {
        match value {
            CookieSameSite::Strict => "Strict",
            CookieSameSite::Lax => "Lax",
            CookieSameSite::None => "None",
        }
        .to_string()
    });
    BrowserCookie {
        name: cookie.name,
        value: cookie.value,
        domain: Some(cookie.domain),
        path: Some(cookie.path),
        // Session cookies report a negative expiry
        expiry: (cookie.expires > 0.0).then_some(cookie.expires.floor()),
        secure: Some(cookie.secure),
        http_only: Some(cookie.http_only),
        same_site,
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<()> {
        tokio::time::timeout(self.navigation_timeout, async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        })
        .await
        .map_err(|_| anyhow!("navigation timed out after {:?}", self.navigation_timeout))?
        .with_context(|| format!("navigation to {url} failed"))
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn find_one(
        &self,
        selector: &SelectorSpec,
        scope: Option<&Self::Element>,
    ) -> Result<Option<Self::Element>> {
        // Lookups fail with "not found" errors; surface the first match instead
        Ok(self.find_all(selector, scope).await?.into_iter().next())
    }

    async fn find_all(
        &self,
        selector: &SelectorSpec,
        scope: Option<&Self::Element>,
    ) -> Result<Vec<Self::Element>> {
        let expr = selector.expression();
        let found = match (selector.engine(), scope) {
            (SelectorEngine::Css, None) => self.page.find_elements(expr).await,
            (SelectorEngine::Css, Some(element)) => element.find_elements(expr).await,
            (SelectorEngine::XPath, None) => self.page.find_xpaths(expr).await,
            (SelectorEngine::XPath, Some(element)) => {
                return self.find_scoped_xpaths(element, expr).await;
            }
        };
        Ok(found?)
    }

    async fn text(&self, element: &Self::Element) -> Result<String> {
        let content = element.property("textContent").await?;
        Ok(content
            .and_then(|value| value.as_str().map(collapse_whitespace))
            .unwrap_or_default())
    }

    async fn set_cookie(&self, cookie: &BrowserCookie) -> Result<()> {
        self.page.set_cookie(to_cookie_param(cookie)).await?;
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<BrowserCookie>> {
        let cookies = self.page.get_cookies().await?;
        Ok(cookies.into_iter().map(from_cookie).collect())
    }

    async fn execute_script(&self, script: &str) -> Result<serde_json::Value> {
        let result = self.page.evaluate(script).await?;
        // `undefined` results carry no value
        Ok(result.into_value().unwrap_or(serde_json::Value::Null))
    }

    async fn page_title(&self) -> Result<String> {
        Ok(self.page.get_title().await?.unwrap_or_default())
    }

    async fn page_source_len(&self) -> Result<usize> {
        Ok(self.page.content().await?.len())
    }
}
