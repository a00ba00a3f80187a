//! Marketplace API access: transport seam, HTTP client and catalog queries.

mod catalog;
mod http_client;
mod query;
mod response;
mod user_agent;

pub use catalog::{normalize_items, CatalogClient, CatalogSource};
pub use http_client::HttpClient;
pub use query::{build_catalog_query, CATALOG_FILTER_KEYS, FRESHNESS_OFFSET_SECS};
pub use response::ApiResponse;
pub use user_agent::{resolve_user_agent, IMPERSONATE_USER_AGENTS, USER_AGENT};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Catalog search endpoint.
pub const CATALOG_ITEMS_PATH: &str = "/api/v2/catalog/items";

/// Request transport against the marketplace host.
///
/// Paths are relative to the configured base URL. Session cookies are
/// attached by the implementation; callers only supply the CSRF token.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET a JSON API path with query parameters.
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<ApiResponse>;

    /// POST a JSON body, authorized with an `x-csrf-token` header.
    async fn post_json(&self, path: &str, body: &Value, csrf_token: &str) -> Result<ApiResponse>;

    /// GET an HTML page and return its body.
    async fn get_page(&self, path: &str) -> Result<String>;

    /// CSRF token last seen in an `x-csrf-token` response header, if any.
    async fn observed_csrf_token(&self) -> Option<String> {
        None
    }
}
