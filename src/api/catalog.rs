//! Catalog search client.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use super::query::build_catalog_query;
use super::{Transport, CATALOG_ITEMS_PATH};
use crate::error::Result;
use crate::models::Item;

/// Something that can list the newest items for a catalog page.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_new_items(&self, page_url: &str) -> Result<Vec<Item>>;
}

/// Catalog search against the marketplace API.
#[derive(Clone)]
pub struct CatalogClient {
    transport: Arc<dyn Transport>,
    default_brand_id: String,
}

impl CatalogClient {
    pub fn new(transport: Arc<dyn Transport>, default_brand_id: impl Into<String>) -> Self {
        Self {
            transport,
            default_brand_id: default_brand_id.into(),
        }
    }
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn fetch_new_items(&self, page_url: &str) -> Result<Vec<Item>> {
        let query = build_catalog_query(page_url, &self.default_brand_id, Utc::now())?;
        let body = self
            .transport
            .get(CATALOG_ITEMS_PATH, &query)
            .await?
            .into_json()?;
        let items = normalize_items(&body);
        debug!("Catalog returned {} items", items.len());
        Ok(items)
    }
}

/// Flatten a catalog response into items.
///
/// The list may sit under `items`, `catalog_items`, `data.items`, `data`,
/// or be the root array. Any other shape yields an empty list.
pub fn normalize_items(body: &Value) -> Vec<Item> {
    let list = body
        .as_array()
        .or_else(|| body.get("items").and_then(|v| v.as_array()))
        .or_else(|| body.get("catalog_items").and_then(|v| v.as_array()))
        .or_else(|| {
            body.get("data")
                .and_then(|d| d.get("items"))
                .and_then(|v| v.as_array())
        })
        .or_else(|| body.get("data").and_then(|v| v.as_array()));

    list.map(|arr| arr.iter().filter_map(Item::from_json).collect())
        .unwrap_or_default()
}
