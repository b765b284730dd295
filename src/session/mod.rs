//! Session bootstrap: persisted cookies, login-redirect detection and the
//! anti-detection settings the live driver is launched with.
//!
//! Every problem here is a warning. A missing or corrupt store, or a cookie
//! the browser rejects, leaves the session without that enhancement and
//! extraction carries on.

pub mod stealth;

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::traits::PageDriver;

/// A cookie restricted to the fields a browser session accepts.
///
/// Deserializing from a store entry drops every other field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Seconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(
        default,
        rename = "httpOnly",
        skip_serializing_if = "Option::is_none"
    )]
    pub http_only: Option<bool>,
    #[serde(
        default,
        rename = "sameSite",
        skip_serializing_if = "Option::is_none"
    )]
    pub same_site: Option<String>,
}

/// Parse a cookie store document, skipping entries that are not valid cookies
pub fn parse_cookie_store(raw: &str) -> Result<Vec<BrowserCookie>> {
    let entries: Vec<serde_json::Value> =
        serde_json::from_str(raw).context("cookie store is not a JSON array")?;

    let mut cookies = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<BrowserCookie>(entry) {
            Ok(cookie) => cookies.push(cookie),
            Err(e) => warn!("Skipping malformed cookie #{}: {}", index, e),
        }
    }
    Ok(cookies)
}

/// Load the cookie store, or an empty set if it is missing or unreadable
pub fn load_cookie_store(path: &Path) -> Vec<BrowserCookie> {
    if !path.exists() {
        debug!("No cookie store at {}", path.display());
        return Vec::new();
    }

    let parsed = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))
        .and_then(|raw| parse_cookie_store(&raw));

    match parsed {
        Ok(cookies) => cookies,
        Err(e) => {
            warn!("Failed to load cookies: {:#}", e);
            Vec::new()
        }
    }
}

/// Inject `cookies` into the session.
///
/// Cookies can only be set once the session domain is loaded, so a
/// lightweight same-domain page is visited first when needed.
///
/// # Returns
/// * `usize` - Number of cookies the session accepted
pub async fn inject_cookies<D: PageDriver>(
    driver: &D,
    cookies: &[BrowserCookie],
    config: &SessionConfig,
) -> usize {
    if cookies.is_empty() {
        return 0;
    }

    let current = driver.current_url().await.unwrap_or_default();
    if !current.contains(&config.session_domain) {
        if let Err(e) = driver.navigate(&config.warmup_url).await {
            warn!(
                "Failed to open {} before cookie injection: {:#}",
                config.warmup_url, e
            );
            return 0;
        }
    }

    let mut injected = 0;
    for cookie in cookies {
        match driver.set_cookie(cookie).await {
            Ok(()) => injected += 1,
            Err(e) => debug!("Cookie {} rejected: {:#}", cookie.name, e),
        }
    }

    info!("Injected {}/{} cookies", injected, cookies.len());
    injected
}

/// Load the configured cookie store and inject it
pub async fn bootstrap_session<D: PageDriver>(driver: &D, config: &SessionConfig) -> usize {
    let cookies = load_cookie_store(&config.cookie_file);
    inject_cookies(driver, &cookies, config).await
}

/// Persist the session's current cookies in store format
///
/// # Returns
/// * `Result<usize>` - Number of cookies written
pub async fn save_cookies<D: PageDriver>(driver: &D, path: &Path) -> Result<usize> {
    let cookies = driver.cookies().await?;
    let json = serde_json::to_string_pretty(&cookies)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    info!("Saved {} cookies to {}", cookies.len(), path.display());
    Ok(cookies.len())
}

/// True when `url` points at one of the login hosts
pub fn is_login_redirect(url: &str, markers: &[String]) -> bool {
    markers.iter().any(|marker| url.contains(marker.as_str()))
}
