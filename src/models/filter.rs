//! Saved search filters.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

/// Value of one query parameter: a single string or a list for array keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Single(String),
    Multi(Vec<String>),
}

impl FilterValue {
    /// All values in order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            FilterValue::Single(s) => vec![s.as_str()],
            FilterValue::Multi(v) => v.iter().map(|s| s.as_str()).collect(),
        }
    }
}

/// A named snapshot of catalog query parameters.
///
/// Filters are immutable; changing one means deleting and saving again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedFilter {
    /// Creation time in milliseconds, as a string.
    pub id: String,
    pub name: String,
    pub params: BTreeMap<String, FilterValue>,
    pub created_at: DateTime<Utc>,
}

impl SavedFilter {
    /// Capture the query parameters of a catalog page URL.
    ///
    /// Keys ending in `[]` and keys that repeat become lists.
    pub fn capture(name: &str, page_url: &str, now: DateTime<Utc>) -> Result<Self> {
        let url = Url::parse(page_url)?;
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in url.query_pairs() {
            grouped
                .entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }

        let params = grouped
            .into_iter()
            .map(|(key, mut values)| {
                let value = if key.ends_with("[]") || values.len() > 1 {
                    FilterValue::Multi(values)
                } else {
                    FilterValue::Single(values.pop().unwrap_or_default())
                };
                (key, value)
            })
            .collect();

        Ok(Self {
            id: now.timestamp_millis().to_string(),
            name: name.trim().to_string(),
            params,
            created_at: now,
        })
    }

    /// Build the catalog URL this filter was captured from, on `catalog_url`.
    pub fn to_url(&self, catalog_url: &str) -> Result<String> {
        let mut url = Url::parse(catalog_url)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            for (key, value) in &self.params {
                for v in value.values() {
                    pairs.append_pair(key, v);
                }
            }
        }
        if self.params.is_empty() {
            url.set_query(None);
        }
        Ok(url.to_string())
    }
}
