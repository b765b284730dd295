//! Table flattening.
//!
//! Two table shapes are told apart per table: a table with a `thead` header
//! row is read column-wise (header cells name the columns of each body row),
//! anything else is read as key/value rows (`th` cells paired with the `td`
//! cells that follow them). Cells with an empty key or value are skipped.

use once_cell::sync::Lazy;

use super::{element_text, resolve_all, resolve_one};
use crate::selector::SelectorSpec;
use crate::traits::PageDriver;

static HEADER_CELLS: Lazy<SelectorSpec> = Lazy::new(|| SelectorSpec::css("thead th"));
static BODY_ROWS: Lazy<SelectorSpec> = Lazy::new(|| SelectorSpec::css("tbody tr"));
static ROWS: Lazy<SelectorSpec> = Lazy::new(|| SelectorSpec::css("tr"));
static KEY_CELLS: Lazy<SelectorSpec> = Lazy::new(|| SelectorSpec::css("th"));
static DATA_CELLS: Lazy<SelectorSpec> = Lazy::new(|| SelectorSpec::css("td"));

/// How a header/body table is flattened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableMode {
    /// One representative body row: `col:v; col:v`
    Attributes,
    /// Every body row as a group: `[col:v; col:v] | [col:v; col:v]`
    Listing,
}

/// Flatten the first table in `chain` that yields any text.
///
/// Later candidates are not consulted once one succeeds, and results from
/// different candidates are never merged.
pub async fn flatten_first<D: PageDriver>(
    driver: &D,
    chain: &[SelectorSpec],
    mode: TableMode,
) -> String {
    for selector in chain {
        let Some(table) = resolve_one(driver, selector, None).await else {
            continue;
        };
        let flattened = flatten_table(driver, &table, mode).await;
        if !flattened.is_empty() {
            return flattened;
        }
    }
    String::new()
}

/// Flatten one table element, detecting its shape
pub async fn flatten_table<D: PageDriver>(driver: &D, table: &D::Element, mode: TableMode) -> String {
    let headers = resolve_all(driver, &HEADER_CELLS, Some(table)).await;
    if headers.is_empty() {
        return join_pairs(&key_value_pairs(driver, table).await);
    }

    let mut columns = Vec::with_capacity(headers.len());
    for header in &headers {
        columns.push(element_text(driver, header).await);
    }

    let rows = resolve_all(driver, &BODY_ROWS, Some(table)).await;
    match mode {
        TableMode::Attributes => match rows.first() {
            Some(row) => {
                let mut pairs = Vec::new();
                for (key, value) in row_pairs(driver, &columns, row).await {
                    push_first(&mut pairs, key, value);
                }
                join_pairs(&pairs)
            }
            None => String::new(),
        },
        TableMode::Listing => {
            let mut groups = Vec::new();
            for row in &rows {
                let pairs = row_pairs(driver, &columns, row).await;
                if !pairs.is_empty() {
                    groups.push(format!("[{}]", join_pairs(&pairs)));
                }
            }
            groups.join(" | ")
        }
    }
}

/// `(column, cell)` pairs of one body row, skipping empty keys and values
async fn row_pairs<D: PageDriver>(
    driver: &D,
    columns: &[String],
    row: &D::Element,
) -> Vec<(String, String)> {
    let cells = resolve_all(driver, &DATA_CELLS, Some(row)).await;
    let mut pairs = Vec::new();
    for (key, cell) in columns.iter().zip(&cells) {
        let value = element_text(driver, cell).await;
        if !key.is_empty() && !value.is_empty() {
            pairs.push((key.clone(), value));
        }
    }
    pairs
}

/// Key/value rows; the first occurrence of a key wins
async fn key_value_pairs<D: PageDriver>(driver: &D, table: &D::Element) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for row in resolve_all(driver, &ROWS, Some(table)).await {
        let keys = resolve_all(driver, &KEY_CELLS, Some(&row)).await;
        let values = resolve_all(driver, &DATA_CELLS, Some(&row)).await;
        for (key_cell, value_cell) in keys.iter().zip(&values) {
            let key = element_text(driver, key_cell).await;
            let value = element_text(driver, value_cell).await;
            if !key.is_empty() && !value.is_empty() {
                push_first(&mut pairs, key, value);
            }
        }
    }
    pairs
}

fn push_first(pairs: &mut Vec<(String, String)>, key: String, value: String) {
    if !pairs.iter().any(|(existing, _)| *existing == key) {
        pairs.push((key, value));
    }
}

fn join_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{key}:{value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::SnapshotPage;
    use crate::selector::chain;

    const LISTING: &str = r#"
        <table id="pack">
          <thead><tr><th>颜色</th><th>尺寸</th></tr></thead>
          <tbody>
            <tr><td>红</td><td>M</td></tr>
            <tr><td>蓝</td><td>L</td></tr>
          </tbody>
        </table>"#;

    const KEY_VALUE: &str = r#"
        <table id="attrs"><tbody>
          <tr><th>材质</th><td>PP</td><th>风格</th><td>日式
             简约</td></tr>
          <tr><th>材质</th><td>ABS</td><th></th><td>orphan</td></tr>
          <tr><th>产地</th><td></td></tr>
        </tbody></table>"#;

    async fn flatten(html: &str, selector: &str, mode: TableMode) -> String {
        let page = SnapshotPage::new("https://example.com", html);
        flatten_first(&page, &chain(&[selector]), mode).await
    }

    #[tokio::test]
    async fn listing_mode_groups_every_row() {
        assert_eq!(
            flatten(LISTING, "css:#pack", TableMode::Listing).await,
            "[颜色:红; 尺寸:M] | [颜色:蓝; 尺寸:L]"
        );
    }

    #[tokio::test]
    async fn attribute_mode_uses_first_body_row() {
        assert_eq!(
            flatten(LISTING, "css:#pack", TableMode::Attributes).await,
            "颜色:红; 尺寸:M"
        );
    }

    #[tokio::test]
    async fn key_value_rows_keep_first_key_and_skip_blanks() {
        assert_eq!(
            flatten(KEY_VALUE, "css:#attrs", TableMode::Attributes).await,
            "材质:PP; 风格:日式 简约"
        );
    }

    #[tokio::test]
    async fn listing_mode_still_reads_key_value_tables() {
        assert_eq!(
            flatten(KEY_VALUE, "css:#attrs", TableMode::Listing).await,
            "材质:PP; 风格:日式 简约"
        );
    }

    #[tokio::test]
    async fn chain_skips_empty_tables_without_merging() {
        let html = format!(
            r#"<table id="empty"><tr><th>空</th><td></td></tr></table>{LISTING}
               <table id="other"><tr><th>重量</th><td>1kg</td></tr></table>"#
        );
        let page = SnapshotPage::new("https://example.com", html);
        let flattened = flatten_first(
            &page,
            &chain(&["css:#missing", "css:#empty", "css:#pack", "css:#other"]),
            TableMode::Listing,
        )
        .await;
        assert_eq!(flattened, "[颜色:红; 尺寸:M] | [颜色:蓝; 尺寸:L]");
    }
}
