//! API endpoint URL builders

use farm_common::types::LivestockStatus;
use uuid::Uuid;

use super::types::{LivestockQuery, PageQuery};

pub fn health_url(base_url: &str) -> String {
    format!("{}/health", base_url)
}

pub fn dashboard_url(base_url: &str) -> String {
    format!("{}/api/v1/reports/dashboard", base_url)
}

pub fn species_url(base_url: &str) -> String {
    format!("{}/api/v1/species", base_url)
}

pub fn species_list_url(base_url: &str, name: Option<&str>, page: PageQuery) -> String {
    let mut params = Vec::new();
    push_param(&mut params, "name", name);
    push_page(&mut params, page);
    with_query(species_url(base_url), params)
}

pub fn livestock_url(base_url: &str) -> String {
    format!("{}/api/v1/livestock", base_url)
}

pub fn livestock_list_url(base_url: &str, query: &LivestockQuery) -> String {
    let mut params = Vec::new();
    push_param(&mut params, "species_id", query.species_id.map(|id| id.to_string()).as_deref());
    push_param(&mut params, "barn_id", query.barn_id.map(|id| id.to_string()).as_deref());
    push_param(&mut params, "status", query.status.as_ref().map(LivestockStatus::as_str));
    push_param(&mut params, "keyword", query.keyword.as_deref());
    push_page(&mut params, query.page);
    with_query(livestock_url(base_url), params)
}

pub fn livestock_details_url(base_url: &str, id: Uuid) -> String {
    format!("{}/api/v1/livestock/{}", base_url, id)
}

pub fn livestock_by_code_url(base_url: &str, code: &str) -> String {
    format!("{}/api/v1/livestock/code/{}", base_url, urlencoding::encode(code))
}

pub fn livestock_status_url(base_url: &str, id: Uuid) -> String {
    format!("{}/api/v1/livestock/{}/status", base_url, id)
}

pub fn batch_imports_url(base_url: &str, status: Option<&str>, page: PageQuery) -> String {
    let mut params = Vec::new();
    push_param(&mut params, "status", status);
    push_page(&mut params, page);
    with_query(format!("{}/api/v1/batch-imports", base_url), params)
}

/// `complete` or `cancel` action on a batch import
pub fn batch_import_action_url(base_url: &str, id: Uuid, action: &str) -> String {
    format!("{}/api/v1/batch-imports/{}/{}", base_url, id, action)
}

pub fn batch_exports_url(base_url: &str, status: Option<&str>, page: PageQuery) -> String {
    let mut params = Vec::new();
    push_param(&mut params, "status", status);
    push_page(&mut params, page);
    with_query(format!("{}/api/v1/batch-exports", base_url), params)
}

pub fn diseases_url(base_url: &str, name: Option<&str>, page: PageQuery) -> String {
    let mut params = Vec::new();
    push_param(&mut params, "name", name);
    push_page(&mut params, page);
    with_query(format!("{}/api/v1/diseases", base_url), params)
}

fn push_param(params: &mut Vec<String>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        params.push(format!("{}={}", key, urlencoding::encode(value)));
    }
}

fn push_page(params: &mut Vec<String>, page: PageQuery) {
    if let Some(p) = page.page {
        params.push(format!("page={}", p));
    }
    if let Some(ps) = page.page_size {
        params.push(format!("page_size={}", ps));
    }
}

fn with_query(mut url: String, params: Vec<String>) -> String {
    if !params.is_empty() {
        url.push('?');
        url.push_str(&params.join("&"));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost:8000";

    #[test]
    fn test_health_url_is_outside_api() {
        assert_eq!(health_url(BASE), "http://localhost:8000/health");
    }

    #[test]
    fn test_livestock_list_url_with_filters() {
        let query = LivestockQuery {
            status: Some(LivestockStatus::Sick),
            keyword: Some("bò vàng".into()),
            page: PageQuery {
                page: Some(2),
                page_size: None,
            },
            ..Default::default()
        };
        assert_eq!(
            livestock_list_url(BASE, &query),
            "http://localhost:8000/api/v1/livestock?status=SICK&keyword=b%C3%B2%20v%C3%A0ng&page=2"
        );
    }

    #[test]
    fn test_list_url_without_params() {
        assert_eq!(
            diseases_url(BASE, None, PageQuery::default()),
            "http://localhost:8000/api/v1/diseases"
        );
    }

    #[test]
    fn test_code_is_encoded() {
        assert_eq!(
            livestock_by_code_url(BASE, "BO 01/2"),
            "http://localhost:8000/api/v1/livestock/code/BO%2001%2F2"
        );
    }
}
