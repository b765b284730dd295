//! SKU-variant extraction: schema-ordered pass plus the single-price fallback

use std::time::Duration;

use tracing::{debug, info};

use super::{resolve_all, resolve_one, text_of};
use crate::catalog::{PageSchema, SelectorCatalog};
use crate::models::SkuRecord;
use crate::normalize::{parse_price, parse_stock};
use crate::traits::PageDriver;

/// Variant label used when a page only shows a single price
pub const DEFAULT_VARIANT_NAME: &str = "默认规格";

/// Stock text recorded for the single-price fallback
pub const DEFAULT_STOCK_TEXT: &str = "默认";

/// Stock value meaning "no known limit"
pub const UNCONSTRAINED_STOCK: u64 = 9999;

/// Extract SKU variants with the first schema whose item list is non-empty.
///
/// Schemas are tried in catalog order. A schema whose wrapper does not
/// appear within `wait`, or whose wrapper holds no items, is skipped; the
/// first schema producing at least one item is authoritative and later
/// schemas are never consulted. Returns an empty list if none match.
pub async fn extract_by_schema<D: PageDriver>(
    driver: &D,
    schemas: &[PageSchema],
    wait: Duration,
) -> Vec<SkuRecord> {
    for schema in schemas {
        let Some(wrapper) = driver.wait_for(&schema.wrapper, wait).await else {
            debug!("Schema '{}' wrapper absent", schema.name);
            continue;
        };

        let items = resolve_all(driver, &schema.item, Some(&wrapper)).await;
        if items.is_empty() {
            debug!("Schema '{}' wrapper holds no items", schema.name);
            continue;
        }

        info!("Matched schema '{}' with {} items", schema.name, items.len());

        let mut skus = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let sku = extract_item(driver, schema, item, index).await;
            debug!(
                "SKU {} | price '{}' -> {:?} | stock '{}' -> {}",
                sku.name, sku.price_text, sku.price, sku.stock_text, sku.stock
            );
            skus.push(sku);
        }
        return skus;
    }
    Vec::new()
}

/// Read one SKU item; each missing field gets its placeholder
async fn extract_item<D: PageDriver>(
    driver: &D,
    schema: &PageSchema,
    item: &D::Element,
    index: usize,
) -> SkuRecord {
    let name = text_of(driver, &schema.name_selector, Some(item))
        .await
        .unwrap_or_else(|| format!("SKU_{}", index + 1));
    let price_text = text_of(driver, &schema.price, Some(item))
        .await
        .unwrap_or_default();
    let stock_text = text_of(driver, &schema.stock, Some(item))
        .await
        .unwrap_or_default();

    SkuRecord {
        name,
        price: parse_price(&price_text),
        price_text,
        stock: parse_stock(&stock_text),
        stock_text,
    }
}

/// Single-variant fallback: the first displayed price that parses.
///
/// Returns exactly one record when a price is found, otherwise an empty list.
pub async fn extract_fallback<D: PageDriver>(driver: &D, catalog: &SelectorCatalog) -> Vec<SkuRecord> {
    for selector in &catalog.single_price {
        let Some(element) = resolve_one(driver, selector, None).await else {
            continue;
        };
        let text = super::element_text(driver, &element).await;
        if let Some(price) = parse_price(&text) {
            return vec![SkuRecord {
                name: DEFAULT_VARIANT_NAME.to_string(),
                price_text: text,
                price: Some(price),
                stock_text: DEFAULT_STOCK_TEXT.to_string(),
                stock: UNCONSTRAINED_STOCK,
            }];
        }
    }
    Vec::new()
}

/// Schema pass, falling back to the single price only when it finds nothing
pub async fn extract_skus<D: PageDriver>(
    driver: &D,
    catalog: &SelectorCatalog,
    wait: Duration,
) -> Vec<SkuRecord> {
    let skus = extract_by_schema(driver, &catalog.schemas, wait).await;
    if !skus.is_empty() {
        return skus;
    }
    info!("No schema matched, trying single-price fallback");
    extract_fallback(driver, catalog).await
}
