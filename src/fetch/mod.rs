//! Single-page orchestration: session bootstrap, navigation, redirect check,
//! title with recovery, then the remaining fields and SKU variants.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tracing::{debug, info};

use crate::catalog::SelectorCatalog;
use crate::config::{EngineConfig, SessionConfig, TimingConfig};
use crate::error::ExtractError;
use crate::extract::{self, sku};
use crate::models::ProductRecord;
use crate::notify::{InterventionEvent, InterventionHook, InterventionKind, LogHook};
use crate::recovery::{RecoveryLoop, RecoveryState};
use crate::session::{self, stealth};
use crate::traits::PageDriver;

pub struct ItemFetcher {
    catalog: SelectorCatalog,
    session: SessionConfig,
    timing: TimingConfig,
    hook: Arc<dyn InterventionHook>,
    /// Cookies are injected once per fetcher, before its first page
    session_ready: AtomicBool,
}

impl ItemFetcher {
    pub fn new(catalog: SelectorCatalog, config: &EngineConfig) -> Self {
        Self {
            catalog,
            session: config.session.clone(),
            timing: config.timing.clone(),
            hook: Arc::new(LogHook),
            session_ready: AtomicBool::new(false),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn InterventionHook>) -> Self {
        self.hook = hook;
        self
    }

    /// Skip cookie injection, e.g. for saved page snapshots
    pub fn without_session_bootstrap(self) -> Self {
        self.session_ready.store(true, Ordering::SeqCst);
        self
    }

    /// Inject the cookie store into `driver` unless already done
    pub async fn prepare_session<D: PageDriver>(&self, driver: &D) {
        if self.session_ready.swap(true, Ordering::SeqCst) {
            return;
        }
        session::bootstrap_session(driver, &self.session).await;
    }

    /// Fetch and extract one product page.
    ///
    /// # Errors
    /// * `AntiBotRedirect` - navigation landed on a login page
    /// * `ExtractionExhausted` - no title appeared within the recovery wait
    /// * `Navigation` - the browser could not load the page
    pub async fn fetch_item<D: PageDriver>(
        &self,
        driver: &D,
        url: &str,
    ) -> Result<ProductRecord, ExtractError> {
        self.prepare_session(driver).await;

        driver
            .navigate(url)
            .await
            .map_err(|source| ExtractError::Navigation {
                url: url.to_string(),
                source,
            })?;

        if let Err(e) = driver.execute_script(stealth::NAVIGATOR_SCRIPT).await {
            debug!("navigator script failed: {:#}", e);
        }

        let landed = driver.current_url().await.unwrap_or_default();
        if session::is_login_redirect(&landed, &self.session.login_markers) {
            self.alert(driver, url, InterventionKind::LoginRedirect).await;
            return Err(ExtractError::AntiBotRedirect { url: landed });
        }

        let catalog = &self.catalog;
        let outcome = RecoveryLoop::new(self.timing.recovery)
            .run(
                move || extract::extract_title(driver, catalog),
                move || async move {
                    self.alert(driver, url, InterventionKind::ChallengeSuspected)
                        .await;
                },
            )
            .await;

        let title = match (outcome.state, outcome.title) {
            (RecoveryState::Success, Some(title)) => title,
            _ => {
                let event = self.alert(driver, url, InterventionKind::RecoveryExhausted).await;
                return Err(ExtractError::ExtractionExhausted {
                    url: event.current_url,
                    page_title: event.page_title,
                    page_len: event.page_len,
                });
            }
        };

        let (shipping_price, shipping_text) = extract::extract_shipping(driver, &self.catalog).await;
        let category = extract::extract_category(driver, &self.catalog).await;
        let specs_text = extract::extract_specs(driver, &self.catalog).await;
        let packaging_text = extract::extract_packaging(driver, &self.catalog).await;
        let skus = sku::extract_skus(driver, &self.catalog, self.timing.schema_wait).await;

        info!("Extracted '{}' with {} SKUs from {}", title, skus.len(), url);

        Ok(ProductRecord {
            url: url.to_string(),
            title,
            shipping_price,
            shipping_text,
            category,
            specs_text,
            packaging_text,
            skus,
            fetched_at: Utc::now(),
        })
    }

    /// Gather page diagnostics and hand them to the hook
    async fn alert<D: PageDriver>(
        &self,
        driver: &D,
        target_url: &str,
        kind: InterventionKind,
    ) -> InterventionEvent {
        let event = InterventionEvent {
            kind,
            target_url: target_url.to_string(),
            current_url: driver.current_url().await.unwrap_or_default(),
            page_title: driver.page_title().await.unwrap_or_default(),
            page_len: driver.page_source_len().await.unwrap_or_default(),
        };
        self.hook.notify(&event).await;
        event
    }
}
