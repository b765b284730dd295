use std::path::Path;

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::fetch::ItemFetcher;
use crate::models::{BatchReport, FetchFailure};
use crate::traits::PageDriver;

/// Runs a batch of product URLs through one fetcher and one browser session
pub struct ListingFinder {
    fetcher: ItemFetcher,
}

impl ListingFinder {
    pub fn new(fetcher: ItemFetcher) -> Self {
        Self { fetcher }
    }

    /// Fetch every URL strictly in order, reusing `driver` throughout.
    ///
    /// A fatal error on one URL is recorded and the batch moves on.
    pub async fn fetch_all<D: PageDriver>(&self, driver: &D, urls: &[String]) -> BatchReport {
        let mut report = BatchReport::default();
        let total = urls.len();

        for (index, url) in urls.iter().enumerate() {
            info!("[{}/{}] Fetching {}", index + 1, total, url);

            match self.fetcher.fetch_item(driver, url).await {
                Ok(product) => report.products.push(product),
                Err(e) => {
                    error!("Error fetching {}: {}", url, e);
                    report.failures.push(FetchFailure {
                        url: url.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if report.failures.is_empty() {
            info!("Fetched all {} products", report.products.len());
        } else {
            info!(
                "Fetched {} products, {} failed",
                report.products.len(),
                report.failures.len()
            );
        }

        report
    }
}

/// Read one URL per non-blank line
pub fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read URL list {}", path.display()))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::browser::SnapshotPage;
    use crate::catalog::SelectorCatalog;
    use crate::config::EngineConfig;
    use crate::recovery::RecoveryPolicy;

    #[tokio::test]
    async fn failures_do_not_stop_the_batch() {
        let blocked = "https://detail.1688.com/offer/2.html";
        let page = SnapshotPage::new(
            "about:blank",
            r#"<h1 class="d-title">折叠伞</h1><span class="price">¥25</span>"#,
        )
        .with_redirect(blocked, "https://login.1688.com/member/signin.htm");

        let mut config = EngineConfig::default();
        config.session.cookie_file = "/nonexistent/cookies.json".into();
        config.timing.schema_wait = Duration::from_millis(5);
        config.timing.recovery = RecoveryPolicy {
            attempts: 0,
            interval: Duration::ZERO,
        };
        let finder = ListingFinder::new(ItemFetcher::new(SelectorCatalog::default(), &config));

        let urls = vec![
            "https://detail.1688.com/offer/1.html".to_string(),
            blocked.to_string(),
            "https://detail.1688.com/offer/3.html".to_string(),
        ];
        let report = finder.fetch_all(&page, &urls).await;

        assert_eq!(report.products.len(), 2);
        assert_eq!(report.products[1].url, "https://detail.1688.com/offer/3.html");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].url, blocked);
        assert!(report.failures[0].error.contains("login"));
        assert_eq!(page.visited(), urls);
    }

    #[test]
    fn url_list_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "  https://a.example/1 \n\n\nhttps://a.example/2\n").unwrap();

        assert_eq!(
            read_url_list(&path).unwrap(),
            ["https://a.example/1", "https://a.example/2"]
        );
    }
}
