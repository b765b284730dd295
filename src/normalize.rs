//! Text-to-value normalizers for scraped fragments.
//!
//! Every function here is total: irregular input yields an absent or default
//! value, never a panic or error.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

/// Markers that mean shipping costs nothing
const FREE_SHIPPING_MARKERS: &[&str] = &["包邮", "免运费"];

// Grouped thousands first so "1,234.50" is read whole rather than as "1"
static PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]{1,3}(?:,[0-9]{3})+(?:\.[0-9]+)?|[0-9]+(?:\.[0-9]+)?").unwrap());

static INTEGER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());

/// Rewrite full-width digits and separators (`１２．５`) as ASCII
fn fold_full_width(text: &str) -> Cow<'_, str> {
    if !text.chars().any(|c| matches!(c, '０'..='９' | '．' | '，')) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|c| match c {
                '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
                '．' => '.',
                '，' => ',',
                other => other,
            })
            .collect(),
    )
}

/// Parse a price out of free text.
///
/// Returns `Some(0.0)` when a free-shipping marker is present, otherwise the
/// first decimal-looking number. `None` when no number can be read.
pub fn parse_price(text: &str) -> Option<f64> {
    if text.trim().is_empty() {
        return None;
    }
    if FREE_SHIPPING_MARKERS.iter().any(|marker| text.contains(marker)) {
        return Some(0.0);
    }
    let text = fold_full_width(text);
    let found = PRICE_RE.find(&text)?;
    found
        .as_str()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Parse the first integer out of free text, or 0
pub fn parse_stock(text: &str) -> u64 {
    let text = fold_full_width(text);
    INTEGER_RE
        .find(&text)
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .unwrap_or(0)
}

/// Collapse whitespace runs into single spaces and trim the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_free_shipping_is_zero() {
        assert_eq!(parse_price("包邮"), Some(0.0));
        assert_eq!(parse_price("快递 包邮 48小时发货"), Some(0.0));
    }

    #[test]
    fn price_reads_first_number() {
        assert_eq!(parse_price("¥12.50 something"), Some(12.50));
        assert_eq!(parse_price("运费 ¥8 起"), Some(8.0));
        assert_eq!(parse_price("1,234.50元"), Some(1234.50));
        assert_eq!(parse_price("¥3.2-4.8"), Some(3.2));
    }

    #[test]
    fn price_absent_without_digits() {
        assert_eq!(parse_price("no digits here"), None);
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("   "), None);
    }

    #[test]
    fn price_never_negative() {
        for text in ["-5", "¥-12.5", "温度 -3 度", "9".repeat(400).as_str()] {
            if let Some(value) = parse_price(text) {
                assert!(value >= 0.0, "{text:?} parsed to {value}");
            }
        }
    }

    #[test]
    fn stock_reads_first_integer() {
        assert_eq!(parse_stock("库存 123 件"), 123);
        assert_eq!(parse_stock("剩余1,200件"), 1);
        assert_eq!(parse_stock(""), 0);
        assert_eq!(parse_stock("缺货"), 0);
    }

    #[test]
    fn full_width_digits_are_read() {
        assert_eq!(parse_price("１２元"), Some(12.0));
        assert_eq!(parse_price("￥１２．５０"), Some(12.5));
        assert_eq!(parse_price("规格１ ¥8.50"), Some(1.0));
        assert_eq!(parse_stock("库存１２３件"), 123);
        assert_eq!(parse_stock("第１批 库存 50"), 1);
    }

    #[test]
    fn other_unicode_digits_are_skipped() {
        assert_eq!(parse_price("٣ ¥8.50"), Some(8.5));
        assert_eq!(parse_stock("٣ 库存 50"), 50);
    }

    #[test]
    fn stock_overflow_defaults_to_zero() {
        assert_eq!(parse_stock(&"9".repeat(40)), 0);
    }

    #[test]
    fn whitespace_is_collapsed() {
        assert_eq!(collapse_whitespace("  红色\n\t XL  "), "红色 XL");
        assert_eq!(collapse_whitespace(""), "");
    }
}
