//! Field extraction over a [`PageDriver`].
//!
//! Resolution never fails: a selector that matches nothing, or a driver
//! error while resolving it, is "not found" and the caller moves on to its
//! next candidate. Scalar fields walk their selector chain in order and stop
//! at the first candidate yielding non-empty text.

pub mod sku;
pub mod table;

use tracing::debug;

use crate::catalog::SelectorCatalog;
use crate::models::UNKNOWN_CATEGORY;
use crate::normalize::{collapse_whitespace, parse_price};
use crate::selector::SelectorSpec;
use crate::traits::PageDriver;

pub use table::TableMode;

/// First element matching `selector`, or `None` on a miss or driver error
pub async fn resolve_one<D: PageDriver>(
    driver: &D,
    selector: &SelectorSpec,
    scope: Option<&D::Element>,
) -> Option<D::Element> {
    match driver.find_one(selector, scope).await {
        Ok(found) => found,
        Err(e) => {
            debug!("{} unresolved: {:#}", selector, e);
            None
        }
    }
}

/// Every element matching `selector`; empty on a miss or driver error
pub async fn resolve_all<D: PageDriver>(
    driver: &D,
    selector: &SelectorSpec,
    scope: Option<&D::Element>,
) -> Vec<D::Element> {
    match driver.find_all(selector, scope).await {
        Ok(found) => found,
        Err(e) => {
            debug!("{} unresolved: {:#}", selector, e);
            Vec::new()
        }
    }
}

/// Whitespace-collapsed text of an element; empty if it cannot be read
pub async fn element_text<D: PageDriver>(driver: &D, element: &D::Element) -> String {
    match driver.text(element).await {
        Ok(text) => collapse_whitespace(&text),
        Err(e) => {
            debug!("element text unreadable: {:#}", e);
            String::new()
        }
    }
}

/// Non-empty text of the first match of `selector` within `scope`
pub async fn text_of<D: PageDriver>(
    driver: &D,
    selector: &SelectorSpec,
    scope: Option<&D::Element>,
) -> Option<String> {
    let element = resolve_one(driver, selector, scope).await?;
    let text = element_text(driver, &element).await;
    (!text.is_empty()).then_some(text)
}

/// Walk `chain` in order and return the first non-empty text
pub async fn first_text<D: PageDriver>(driver: &D, chain: &[SelectorSpec]) -> Option<String> {
    for selector in chain {
        if let Some(text) = text_of(driver, selector, None).await {
            return Some(text);
        }
    }
    None
}

/// Product title, or empty when no candidate matches
pub async fn extract_title<D: PageDriver>(driver: &D, catalog: &SelectorCatalog) -> String {
    first_text(driver, &catalog.title).await.unwrap_or_default()
}

/// Product category, or [`UNKNOWN_CATEGORY`]
pub async fn extract_category<D: PageDriver>(driver: &D, catalog: &SelectorCatalog) -> String {
    first_text(driver, &catalog.category)
        .await
        .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string())
}

/// Shipping cost and the text it was read from.
///
/// Several shipping widgets share a selector, so every match of each
/// candidate is checked for a parseable price before moving on.
pub async fn extract_shipping<D: PageDriver>(
    driver: &D,
    catalog: &SelectorCatalog,
) -> (f64, String) {
    for selector in &catalog.shipping {
        for element in resolve_all(driver, selector, None).await {
            let text = element_text(driver, &element).await;
            if text.is_empty() {
                continue;
            }
            if let Some(price) = parse_price(&text) {
                return (price, text);
            }
        }
    }
    (0.0, String::new())
}

/// Attribute table flattened to `key:value; key:value`
pub async fn extract_specs<D: PageDriver>(driver: &D, catalog: &SelectorCatalog) -> String {
    table::flatten_first(driver, &catalog.attributes_table, TableMode::Attributes).await
}

/// Packaging table flattened to `[col:v; col:v] | [col:v; col:v]`
pub async fn extract_packaging<D: PageDriver>(driver: &D, catalog: &SelectorCatalog) -> String {
    table::flatten_first(driver, &catalog.packaging_table, TableMode::Listing).await
}
