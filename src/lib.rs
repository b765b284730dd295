//! Adaptive product-listing extraction for e-commerce pages whose templates
//! drift over time and which defend against automation.
//!
//! The engine reads a page through the [`traits::PageDriver`] capability set,
//! walks ordered selector chains for each field, picks SKU variants with the
//! first matching page schema, and waits for an operator when a verification
//! challenge hides the page.

pub mod browser;
pub mod catalog;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod listing_finder;
pub mod models;
pub mod normalize;
pub mod notify;
pub mod recovery;
pub mod selector;
pub mod session;
pub mod traits;

#[cfg(test)]
mod testing;

pub use catalog::{PageSchema, SelectorCatalog};
pub use config::EngineConfig;
pub use error::ExtractError;
pub use fetch::ItemFetcher;
pub use listing_finder::ListingFinder;
pub use models::{BatchReport, ProductRecord, SkuRecord};
pub use selector::SelectorSpec;
pub use traits::PageDriver;
