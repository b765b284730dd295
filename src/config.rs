//! Engine configuration, read from the environment after `.env` is loaded.
//!
//! | Variable                   | Effect                                   |
//! |----------------------------|------------------------------------------|
//! | `COOKIE_FILE`              | cookie store path (default `cookies.json`) |
//! | `BROWSER_BIN`              | browser executable                       |
//! | `BROWSER_PROFILE_PATH`     | user-data directory, used if it exists   |
//! | `HEADLESS`                 | `1`/`true` for a headless session        |
//! | `INTERVENTION_WEBHOOK_URL` | webhook notified when an operator is needed |

use std::path::PathBuf;
use std::time::Duration;

use crate::recovery::RecoveryPolicy;

/// Where cookies live and how login redirects are recognised
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_file: PathBuf,
    /// Cookies can only be set while a page on this domain is loaded
    pub session_domain: String,
    /// Lightweight same-domain page opened before cookie injection
    pub warmup_url: String,
    /// URL fragments identifying login pages
    pub login_markers: Vec<String>,
    /// Page opened when capturing cookies after a manual login
    pub login_page: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_file: PathBuf::from("cookies.json"),
            session_domain: "1688.com".to_string(),
            warmup_url: "https://www.1688.com/robots.txt".to_string(),
            login_markers: vec![
                "login.1688.com".to_string(),
                "login.taobao.com".to_string(),
            ],
            login_page: "https://login.1688.com/member/signin.htm".to_string(),
        }
    }
}

/// Bounded waits used during one page fetch
#[derive(Debug, Clone)]
pub struct TimingConfig {
    /// How long a schema wrapper may take to render
    pub schema_wait: Duration,
    pub navigation_timeout: Duration,
    pub recovery: RecoveryPolicy,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            schema_wait: Duration::from_secs(2),
            navigation_timeout: Duration::from_secs(30),
            recovery: RecoveryPolicy::default(),
        }
    }
}

impl TimingConfig {
    /// Timings for a saved page: it will not change, so nothing is waited for
    pub fn static_page(&self) -> Self {
        Self {
            schema_wait: Duration::ZERO,
            recovery: RecoveryPolicy {
                attempts: 0,
                ..self.recovery
            },
            ..self.clone()
        }
    }
}

/// Launch options for the live browser
#[derive(Debug, Clone, Default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub binary: Option<PathBuf>,
    pub profile_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub session: SessionConfig,
    pub timing: TimingConfig,
    pub browser: BrowserSettings,
    pub webhook_url: Option<String>,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("COOKIE_FILE") {
            config.session.cookie_file = PathBuf::from(path);
        }
        config.browser.binary = lookup("BROWSER_BIN").map(PathBuf::from);
        config.browser.profile_dir = lookup("BROWSER_PROFILE_PATH")
            .map(PathBuf::from)
            .filter(|path| path.exists());
        config.browser.headless = lookup("HEADLESS")
            .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"));
        config.webhook_url = lookup("INTERVENTION_WEBHOOK_URL").filter(|url| !url.trim().is_empty());

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn static_page_timing_never_waits() {
        let timing = TimingConfig::default().static_page();
        assert_eq!(timing.schema_wait, Duration::ZERO);
        assert_eq!(timing.recovery.attempts, 0);
        assert_eq!(timing.recovery.total_wait(), Duration::ZERO);
        assert_eq!(timing.navigation_timeout, Duration::from_secs(30));
    }

    #[test]
    fn defaults_without_environment() {
        let config = EngineConfig::from_lookup(|_| None);
        assert_eq!(config.session.cookie_file, PathBuf::from("cookies.json"));
        assert!(!config.browser.headless);
        assert!(config.webhook_url.is_none());
        assert_eq!(config.timing.recovery.attempts, 6);
        assert_eq!(config.timing.recovery.interval, Duration::from_secs(5));
    }

    #[test]
    fn reads_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let vars: HashMap<&str, String> = HashMap::from([
            ("COOKIE_FILE", "/tmp/session.json".to_string()),
            ("HEADLESS", "TRUE".to_string()),
            ("BROWSER_PROFILE_PATH", dir.path().display().to_string()),
            ("INTERVENTION_WEBHOOK_URL", "  ".to_string()),
        ]);
        let config = EngineConfig::from_lookup(|key| vars.get(key).cloned());

        assert_eq!(config.session.cookie_file, PathBuf::from("/tmp/session.json"));
        assert!(config.browser.headless);
        assert_eq!(config.browser.profile_dir.as_deref(), Some(dir.path()));
        assert!(config.webhook_url.is_none());
    }

    #[test]
    fn missing_profile_dir_is_ignored() {
        let config = EngineConfig::from_lookup(|key| {
            (key == "BROWSER_PROFILE_PATH").then(|| "/nonexistent/profile".to_string())
        });
        assert!(config.browser.profile_dir.is_none());
    }
}
