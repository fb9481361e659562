//! HTTP API client for the farm back office server
//!
//! Reads go through the [`QueryCache`]; each mutation invalidates the keys of
//! the aggregates it touches.

use crate::api::{endpoints, types::*};
use crate::cache::{QueryCache, QueryKey};
use crate::error::{CliError, Result};
use farm_common::types::{BatchExportStatus, BatchImportStatus, LivestockStatus};
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

// ============================================================================
// API Client Constants
// ============================================================================

/// Default timeout for API requests in seconds.
/// Can be overridden via FARM_API_TIMEOUT_SECS.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// Default server URL when FARM_SERVER_URL is not set.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Query-key roots, one per aggregate
const SPECIES: &str = "species";
const LIVESTOCK: &str = "livestock";
const BATCH_IMPORTS: &str = "batch-imports";
const BATCH_EXPORTS: &str = "batch-exports";
const DISEASES: &str = "diseases";
const REPORTS: &str = "reports";

pub struct ApiClient {
    client: Client,
    base_url: String,
    cache: QueryCache,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let timeout_secs = std::env::var("FARM_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_API_TIMEOUT_SECS);

        Self::with_cache(base_url, Duration::from_secs(timeout_secs), QueryCache::from_env())
    }

    pub fn with_cache(
        base_url: impl Into<String>,
        timeout: Duration,
        cache: QueryCache,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(CliError::config("Server URL is empty"));
        }
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            cache,
        })
    }

    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("FARM_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
        Self::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Server health; never cached
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = endpoints::health_url(&self.base_url);
        self.send(self.client.get(&url)).await
    }

    pub async fn dashboard(&self) -> Result<Dashboard> {
        let url = endpoints::dashboard_url(&self.base_url);
        self.cached(QueryKey::new([REPORTS, "dashboard"]), url).await
    }

    pub async fn list_species(&self, name: Option<&str>, page: PageQuery) -> Result<Page<Species>> {
        let url = endpoints::species_list_url(&self.base_url, name, page);
        self.cached(list_key(SPECIES, &url), url).await
    }

    pub async fn list_livestock(&self, query: &LivestockQuery) -> Result<Page<Livestock>> {
        let url = endpoints::livestock_list_url(&self.base_url, query);
        self.cached(list_key(LIVESTOCK, &url), url).await
    }

    pub async fn get_livestock(&self, id: Uuid) -> Result<Livestock> {
        let url = endpoints::livestock_details_url(&self.base_url, id);
        self.cached(QueryKey::new([LIVESTOCK.to_string(), "detail".into(), id.to_string()]), url)
            .await
    }

    pub async fn get_livestock_by_code(&self, code: &str) -> Result<Livestock> {
        let url = endpoints::livestock_by_code_url(&self.base_url, code);
        self.cached(QueryKey::new([LIVESTOCK, "code", code]), url).await
    }

    pub async fn list_batch_imports(
        &self,
        status: Option<BatchImportStatus>,
        page: PageQuery,
    ) -> Result<Page<BatchImport>> {
        let status = status.map(|s| s.as_str());
        let url = endpoints::batch_imports_url(&self.base_url, status, page);
        self.cached(list_key(BATCH_IMPORTS, &url), url).await
    }

    pub async fn list_batch_exports(
        &self,
        status: Option<BatchExportStatus>,
        page: PageQuery,
    ) -> Result<Page<BatchExport>> {
        let status = status.map(|s| s.as_str());
        let url = endpoints::batch_exports_url(&self.base_url, status, page);
        self.cached(list_key(BATCH_EXPORTS, &url), url).await
    }

    pub async fn list_diseases(&self, name: Option<&str>, page: PageQuery) -> Result<Page<Disease>> {
        let url = endpoints::diseases_url(&self.base_url, name, page);
        self.cached(list_key(DISEASES, &url), url).await
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    pub async fn create_species(&self, request: &CreateSpeciesRequest) -> Result<Species> {
        let url = endpoints::species_url(&self.base_url);
        let species = self.send(self.client.post(&url).json(request)).await?;
        self.invalidate(&[SPECIES, REPORTS]);
        Ok(species)
    }

    pub async fn change_livestock_status(
        &self,
        id: Uuid,
        status: LivestockStatus,
    ) -> Result<Livestock> {
        let url = endpoints::livestock_status_url(&self.base_url, id);
        let animal = self
            .send(self.client.put(&url).json(&ChangeStatusRequest { status }))
            .await?;
        self.invalidate(&[LIVESTOCK, REPORTS]);
        Ok(animal)
    }

    pub async fn complete_batch_import(&self, id: Uuid) -> Result<BatchImport> {
        self.batch_import_action(id, "complete").await
    }

    pub async fn cancel_batch_import(&self, id: Uuid) -> Result<BatchImport> {
        self.batch_import_action(id, "cancel").await
    }

    async fn batch_import_action(&self, id: Uuid, action: &str) -> Result<BatchImport> {
        let url = endpoints::batch_import_action_url(&self.base_url, id, action);
        let batch = self.send(self.client.post(&url)).await?;
        self.invalidate(&[BATCH_IMPORTS, LIVESTOCK, REPORTS]);
        Ok(batch)
    }

    // ------------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------------

    fn invalidate(&self, roots: &[&str]) {
        for root in roots {
            self.cache.invalidate(&[*root]);
        }
    }

    async fn cached<T>(&self, key: QueryKey, url: String) -> Result<T>
    where
        T: DeserializeOwned + Serialize,
    {
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }
        let data: T = self.send(self.client.get(&url)).await?;
        self.cache.insert(key, &data);
        Ok(data)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "Received response");
        decode_envelope(status.as_u16(), &body)
    }
}

/// One cache slot per distinct list URL
fn list_key(root: &str, url: &str) -> QueryKey {
    let query = url.split_once('?').map(|(_, q)| q).unwrap_or_default();
    QueryKey::new([root, "list", query])
}

/// Unwrap `data` from an envelope; a failure envelope or non-JSON error body
/// becomes [`CliError::Api`]
pub fn decode_envelope<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T> {
    let envelope: ApiResponse<T> = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(e) if (200..300).contains(&status) => return Err(e.into()),
        Err(_) => {
            let text = String::from_utf8_lossy(body).trim().to_string();
            let message = if text.is_empty() {
                "request failed".to_string()
            } else {
                text
            };
            return Err(CliError::api(status, message));
        },
    };

    if !envelope.success {
        return Err(CliError::api(envelope.status_code, envelope.failure_message()));
    }

    envelope
        .data
        .ok_or_else(|| CliError::api(envelope.status_code, "Response carried no data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_success() {
        let body = br#"{"statusCode":200,"success":true,"data":{"status":"healthy","database":"memory","version":"0.1.0"},"errors":null,"message":"OK"}"#;
        let health: HealthStatus = decode_envelope(200, body).unwrap();
        assert_eq!(health.database, "memory");
    }

    #[test]
    fn test_decode_failure_envelope() {
        let body = br#"{"statusCode":404,"success":false,"data":null,"errors":[{"code":"NOT_FOUND","message":"Livestock not found"}],"message":"Livestock not found"}"#;
        let err = decode_envelope::<Livestock>(404, body).unwrap_err();
        match err {
            CliError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Livestock not found");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_plain_text_error() {
        let err = decode_envelope::<Livestock>(429, b"Too Many Requests! Wait for 2s").unwrap_err();
        assert_eq!(err.status(), Some(429));
        assert!(err.to_string().contains("Too Many Requests"));
    }

    #[test]
    fn test_decode_garbage_on_success_is_parse_error() {
        let err = decode_envelope::<Livestock>(200, b"<html>").unwrap_err();
        assert!(matches!(err, CliError::JsonParse(_)));
    }

    #[test]
    fn test_list_key_uses_query_string() {
        assert_eq!(
            list_key(LIVESTOCK, "http://x/api/v1/livestock?status=SICK"),
            QueryKey::new(["livestock", "list", "status=SICK"])
        );
        assert_eq!(
            list_key(SPECIES, "http://x/api/v1/species"),
            QueryKey::new(["species", "list", ""])
        );
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client =
            ApiClient::with_cache("http://farm.local/", Duration::from_secs(1), QueryCache::new(Duration::ZERO))
                .unwrap();
        assert_eq!(client.base_url(), "http://farm.local");
    }
}
