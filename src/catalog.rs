//! Selector catalogs: fallback chains for scalar fields and the ordered
//! page-schema list for SKU variants.
//!
//! The catalog is plain configuration data injected into the fetcher at
//! construction time, so a deployment can ship an updated JSON catalog
//! without a rebuild.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::selector::{SelectorSpec, chain};

/// How one known page template exposes its SKU-variant list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSchema {
    /// Name used in logs when this schema wins
    pub name: String,
    /// Container whose presence identifies the template
    pub wrapper: SelectorSpec,
    /// One element per SKU variant, resolved inside the wrapper
    pub item: SelectorSpec,
    /// Variant label, resolved inside each item
    pub name_selector: SelectorSpec,
    /// Price text, resolved inside each item
    pub price: SelectorSpec,
    /// Stock text, resolved inside each item
    pub stock: SelectorSpec,
}

/// Priority-ordered selector chains for every field the fetcher reads.
///
/// Order is significant everywhere: earlier candidates win.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorCatalog {
    pub title: Vec<SelectorSpec>,
    pub shipping: Vec<SelectorSpec>,
    pub category: Vec<SelectorSpec>,
    pub single_price: Vec<SelectorSpec>,
    pub attributes_table: Vec<SelectorSpec>,
    pub packaging_table: Vec<SelectorSpec>,
    pub schemas: Vec<PageSchema>,
}

impl SelectorCatalog {
    /// Load a catalog from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse catalog {}", path.display()))
    }
}

impl Default for SelectorCatalog {
    fn default() -> Self {
        Self {
            title: chain(&[
                "css:div.title-content h1",
                "css:div.title-text",
                "css:h1.d-title",
                "css:.mod-detail-title h1",
            ]),
            shipping: chain(&[
                "css:em.service-item",
                "css:.logistics-express-price",
                "css:.logistics-cost",
                "css:.postage-cost",
                "css:.freight-cost",
                "css:.service-item",
            ]),
            category: chain(&[
                "css:.od-pc-offer-cate .cate-name",
                "css:.od-breadcrumb-container",
                "css:.mod-detail-breadcrumb",
                "css:.breadcrumb",
            ]),
            single_price: chain(&[
                "css:.discountPrice-price",
                "css:.price-text",
                "css:.offer-current-price .value",
                "css:span.price",
                "css:.item-price-stock",
                "css:.discount-price .value",
            ]),
            attributes_table: chain(&[
                "css:#productAttributes table",
                "css:.od-collapse-module[data-spm-anchor-id*='productAttributes'] table",
                "css:div[data-spm-anchor-id*='productAttributes'] table",
                "css:.ant-descriptions-view table",
            ]),
            packaging_table: chain(&[
                "css:#productPackInfo table",
                "css:[data-module='od_product_pack_info'] table",
            ]),
            schemas: vec![
                PageSchema {
                    name: "Standard_Retail".to_string(),
                    wrapper: SelectorSpec::parse("css:#sku-count-widget-wrapper"),
                    item: SelectorSpec::parse("css:.sku-item-wrapper"),
                    name_selector: SelectorSpec::parse("css:.sku-item-name"),
                    price: SelectorSpec::parse("css:.discountPrice-price"),
                    stock: SelectorSpec::parse("css:.sku-item-sale-num"),
                },
                PageSchema {
                    name: "Expand_View_Template".to_string(),
                    wrapper: SelectorSpec::parse("css:.expand-view-list"),
                    item: SelectorSpec::parse("css:.expand-view-item"),
                    name_selector: SelectorSpec::parse("css:.item-label"),
                    price: SelectorSpec::parse("css:.item-price-stock"),
                    stock: SelectorSpec::parse("css:od-text[i18n='sku-stock']"),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_catalog_keeps_schema_priority() {
        let catalog = SelectorCatalog::default();
        let names: Vec<_> = catalog.schemas.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Standard_Retail", "Expand_View_Template"]);
        assert_eq!(catalog.title[0], SelectorSpec::css("div.title-content h1"));
    }

    #[test]
    fn catalog_round_trips_through_json_file() {
        let mut catalog = SelectorCatalog::default();
        catalog.title = vec![SelectorSpec::xpath("//h1")];

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&catalog).unwrap()).unwrap();

        let loaded = SelectorCatalog::from_file(file.path()).unwrap();
        assert_eq!(loaded, catalog);
    }

    #[test]
    fn missing_catalog_file_is_an_error() {
        assert!(SelectorCatalog::from_file("/nonexistent/catalog.json").is_err());
    }
}
