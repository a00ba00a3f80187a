//! Catalog request building from a monitored page URL.

use chrono::{DateTime, Utc};
use url::Url;

use crate::error::Result;

/// Query keys passed through from the monitored page.
pub const CATALOG_FILTER_KEYS: &[&str] = &[
    "brand_ids[]",
    "size_ids[]",
    "color_ids[]",
    "material_ids[]",
    "status_ids[]",
    "catalog_ids[]",
    "price_from",
    "price_to",
    "currency",
    "order",
];

/// How far ahead the `time` parameter is stamped.
pub const FRESHNESS_OFFSET_SECS: i64 = 30;

const BRAND_KEY: &str = "brand_ids[]";
const ORDER_KEY: &str = "order";
const NEWEST_FIRST: &str = "newest_first";

fn is_passthrough_key(key: &str) -> bool {
    CATALOG_FILTER_KEYS.contains(&key) || key.ends_with("[]")
}

/// Build catalog search parameters from the page being monitored.
///
/// Allow-listed keys and any `[]` array key are copied verbatim. A missing
/// brand filter gets `default_brand_id`, a missing order gets
/// `newest_first`, the page is always 1 and `time` is `now + 30s`.
pub fn build_catalog_query(
    page_url: &str,
    default_brand_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<(String, String)>> {
    let url = Url::parse(page_url)?;

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| is_passthrough_key(key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let has = |params: &[(String, String)], key: &str| params.iter().any(|(k, _)| k == key);

    if !has(&params, BRAND_KEY) && !default_brand_id.is_empty() {
        params.push((BRAND_KEY.to_string(), default_brand_id.to_string()));
    }
    if !has(&params, ORDER_KEY) {
        params.push((ORDER_KEY.to_string(), NEWEST_FIRST.to_string()));
    }

    params.push(("page".to_string(), "1".to_string()));
    params.push((
        "time".to_string(),
        (now.timestamp() + FRESHNESS_OFFSET_SECS).to_string(),
    ));

    Ok(params)
}
