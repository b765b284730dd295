//! Page driver implementations: a live Chromium session and a static HTML snapshot

pub mod chromium;
pub mod snapshot;
mod xpath;

pub use chromium::ChromiumDriver;
pub use snapshot::SnapshotPage;
