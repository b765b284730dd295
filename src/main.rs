use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use listing_extractor::browser::{ChromiumDriver, SnapshotPage};
use listing_extractor::listing_finder::read_url_list;
use listing_extractor::notify::{InterventionHook, LogHook, WebhookNotifier};
use listing_extractor::session::save_cookies;
use listing_extractor::traits::PageDriver;
use listing_extractor::{EngineConfig, ItemFetcher, ListingFinder, SelectorCatalog};

#[derive(Parser)]
#[command(name = "listing-extractor", about = "Extract product listings from rendered pages")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch every URL in a list with one browser session
    Fetch {
        /// Text file with one product URL per line
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "result.json")]
        out: PathBuf,
        #[arg(long)]
        headless: bool,
        /// JSON selector catalog replacing the built-in one
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Extract from a saved page source without a browser
    Snapshot {
        #[arg(long)]
        html: PathBuf,
        /// URL the page was saved from
        #[arg(long)]
        url: String,
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Log in manually in a headed browser and store the session cookies
    SaveCookies {
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn load_catalog(path: Option<&PathBuf>) -> Result<SelectorCatalog> {
    match path {
        Some(path) => SelectorCatalog::from_file(path),
        None => Ok(SelectorCatalog::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = EngineConfig::from_env();

    match Cli::parse().command {
        Command::Fetch {
            input,
            out,
            headless,
            catalog,
        } => {
            let urls = read_url_list(&input)?;
            if urls.is_empty() {
                info!("No URLs in {}", input.display());
                return Ok(());
            }
            config.browser.headless |= headless;

            let hook: Arc<dyn InterventionHook> = match config.webhook_url.clone() {
                Some(url) => Arc::new(WebhookNotifier::new(Some(url))),
                None => Arc::new(LogHook),
            };
            let fetcher = ItemFetcher::new(load_catalog(catalog.as_ref())?, &config).with_hook(hook);
            let finder = ListingFinder::new(fetcher);

            let driver = ChromiumDriver::launch(&config.browser, config.timing.navigation_timeout).await?;
            let report = finder.fetch_all(&driver, &urls).await;
            driver.close().await;

            std::fs::write(&out, serde_json::to_string_pretty(&report)?)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(
                "Wrote {} products ({} failed) to {}",
                report.products.len(),
                report.failures.len(),
                out.display()
            );
        }
        Command::Snapshot { html, url, catalog } => {
            let source = std::fs::read_to_string(&html)
                .with_context(|| format!("failed to read {}", html.display()))?;
            let page = SnapshotPage::new(url.clone(), source);

            config.timing = config.timing.static_page();
            let fetcher =
                ItemFetcher::new(load_catalog(catalog.as_ref())?, &config).without_session_bootstrap();

            let record = fetcher.fetch_item(&page, &url).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::SaveCookies { out } => {
            config.browser.headless = false;
            let out = out.unwrap_or_else(|| config.session.cookie_file.clone());

            let driver = ChromiumDriver::launch(&config.browser, config.timing.navigation_timeout).await?;
            driver.navigate(&config.session.login_page).await?;

            info!("Log in through the browser window, then press Enter here");
            let mut line = String::new();
            BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;

            let saved = save_cookies(&driver, &out).await;
            driver.close().await;
            saved?;
        }
    }

    Ok(())
}
