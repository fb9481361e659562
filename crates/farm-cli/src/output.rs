//! Terminal rendering helpers

use crate::api::types::Pagination;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};

/// Table with the CLI's standard look and the given header row
pub fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

/// Two-column key/value table for a single record
pub fn details(rows: Vec<(&str, String)>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    for (key, value) in rows {
        table.add_row(vec![key.to_string(), value]);
    }
    table
}

pub fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn page_footer(pagination: &Pagination) -> String {
    format!(
        "Page {} of {} ({} total)",
        pagination.page,
        pagination.total_pages.max(1),
        pagination.total
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opt_placeholder() {
        assert_eq!(opt(None::<String>), "-");
        assert_eq!(opt(Some(12.5)), "12.5");
    }

    #[test]
    fn test_page_footer_on_empty_result() {
        let pagination = Pagination {
            page: 1,
            page_size: 20,
            total: 0,
            total_pages: 0,
        };
        assert_eq!(page_footer(&pagination), "Page 1 of 1 (0 total)");
    }

    #[test]
    fn test_table_renders_header() {
        let mut t = table(&["Code", "Status"]);
        t.add_row(vec!["000001", "HEALTHY"]);
        let rendered = t.to_string();
        assert!(rendered.contains("Code"));
        assert!(rendered.contains("000001"));
    }
}
