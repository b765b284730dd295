//! Data models for extracted product listings and webhook payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category value used when no category selector matches
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// One purchasable variant of a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuRecord {
    pub name: String,
    pub price_text: String,
    /// `None` when the price text held no number
    pub price: Option<f64>,
    pub stock_text: String,
    pub stock: u64,
}

/// A product page as extracted by one fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub url: String,
    pub title: String,
    pub shipping_price: f64,
    pub shipping_text: String,
    pub category: String,
    pub specs_text: String,
    pub packaging_text: String,
    pub skus: Vec<SkuRecord>,
    pub fetched_at: DateTime<Utc>,
}

impl ProductRecord {
    /// Procurement cost: the first SKU carrying a non-zero price, else 0.0
    pub fn base_cost(&self) -> f64 {
        self.skus
            .iter()
            .filter_map(|sku| sku.price)
            .find(|price| *price != 0.0)
            .unwrap_or(0.0)
    }

    /// Attribute and packaging text as one sectioned block
    pub fn combined_specs(&self) -> String {
        let mut sections = Vec::new();
        if !self.specs_text.is_empty() {
            sections.push(format!("【基本属性】\n{}", self.specs_text));
        }
        if !self.packaging_text.is_empty() {
            sections.push(format!("【物流包装】\n{}", self.packaging_text));
        }
        if sections.is_empty() {
            "暂无详细规格数据".to_string()
        } else {
            sections.join("\n\n")
        }
    }
}

/// A URL whose extraction ended in a fatal error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchFailure {
    pub url: String,
    pub error: String,
}

/// Outcome of a sequential batch: partial results plus per-URL failures
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub products: Vec<ProductRecord>,
    pub failures: Vec<FetchFailure>,
}

/// Embed structure for intervention webhook messages
#[derive(Debug, Serialize)]
pub struct WebhookEmbed {
    pub title: String,
    pub description: String,
    pub url: String,
    pub color: u32,
    pub timestamp: String,
    pub fields: Vec<WebhookField>,
}

/// Key-value field for webhook embeds
#[derive(Debug, Serialize)]
pub struct WebhookField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Webhook message payload
#[derive(Debug, Serialize)]
pub struct WebhookMessage {
    pub embeds: Vec<WebhookEmbed>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(skus: Vec<SkuRecord>) -> ProductRecord {
        ProductRecord {
            url: "https://detail.1688.com/offer/1.html".to_string(),
            title: "保温杯".to_string(),
            shipping_price: 0.0,
            shipping_text: String::new(),
            category: UNKNOWN_CATEGORY.to_string(),
            specs_text: String::new(),
            packaging_text: String::new(),
            skus,
            fetched_at: Utc::now(),
        }
    }

    fn sku(price: Option<f64>) -> SkuRecord {
        SkuRecord {
            name: "红色".to_string(),
            price_text: String::new(),
            price,
            stock_text: String::new(),
            stock: 0,
        }
    }

    #[test]
    fn base_cost_skips_missing_prices() {
        assert_eq!(record(vec![sku(None), sku(Some(12.5))]).base_cost(), 12.5);
        assert_eq!(record(vec![]).base_cost(), 0.0);
    }

    #[test]
    fn combined_specs_sections() {
        let mut product = record(vec![]);
        assert_eq!(product.combined_specs(), "暂无详细规格数据");

        product.specs_text = "材质:PP".to_string();
        product.packaging_text = "[重量:0.5kg]".to_string();
        assert_eq!(
            product.combined_specs(),
            "【基本属性】\n材质:PP\n\n【物流包装】\n[重量:0.5kg]"
        );
    }

    #[test]
    fn record_serializes_explicit_field_names() {
        let value = serde_json::to_value(record(vec![sku(None)])).unwrap();
        assert_eq!(value["category"], "unknown");
        assert!(value["skus"][0]["price"].is_null());
        assert_eq!(value["shippingPrice"], 0.0);
        assert!(value.get("specsText").is_some());
        assert!(value.get("packagingText").is_some());
        assert!(value.get("fetchedAt").is_some());
        assert!(value["skus"][0].get("priceText").is_some());
        assert!(value["skus"][0].get("stockText").is_some());
        assert!(value.get("shipping_price").is_none());
    }
}
