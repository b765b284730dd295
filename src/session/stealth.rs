//! Anti-detection settings applied when a live browser session is launched

/// Conventional desktop user agent reported by the session
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Locale reported through `--lang` and `Accept-Language`
pub const ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8";

/// Desktop-sized window; small windows get mobile layouts and extra scrutiny
pub const WINDOW_SIZE: (u32, u32) = (1920, 1080);

/// Hides the `navigator.webdriver` automation flag
pub const NAVIGATOR_SCRIPT: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });";

/// Launch arguments shared by headed and headless sessions.
///
/// Replaces the driver defaults, which include `--enable-automation`.
pub fn launch_args() -> Vec<String> {
    vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        format!("--user-agent={DESKTOP_USER_AGENT}"),
        "--lang=zh-CN".to_string(),
        format!("--accept-lang={ACCEPT_LANGUAGE}"),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-infobars".to_string(),
        "--disable-popup-blocking".to_string(),
        "--password-store=basic".to_string(),
    ]
}

/// Extra arguments for headless server runs: trim memory and bandwidth
pub fn headless_args() -> Vec<String> {
    vec![
        "--headless=new".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--blink-settings=imagesEnabled=false".to_string(),
        "--disk-cache-size=0".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn automation_switch_is_suppressed() {
        let args = launch_args();
        assert!(args.contains(&"--disable-blink-features=AutomationControlled".to_string()));
        assert!(!args.iter().any(|a| a == "--enable-automation"));
        assert!(args.iter().any(|a| a.starts_with("--user-agent=Mozilla/5.0 (Windows")));
    }
}
