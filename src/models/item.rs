//! Catalog item model.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{json_id, json_str, json_title};

/// Listing price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    /// Decimal amount as sent by the API (kept textual to avoid rounding).
    pub amount: String,
    /// ISO currency code, when the API provided one.
    pub currency: Option<String>,
}

impl Price {
    /// Parse a price from the shapes the catalog API uses.
    ///
    /// - `"price": {"amount": "12.0", "currency_code": "EUR"}`
    /// - `"price": "12.0"` with a sibling `currency` or `currency_code`
    /// - `"total_item_price": {...}` when `price` is missing
    fn from_item_json(item: &Value) -> Option<Self> {
        match item.get("price") {
            Some(obj @ Value::Object(_)) => Self::from_object(obj),
            Some(scalar @ (Value::String(_) | Value::Number(_))) => {
                let amount = scalar_amount(scalar)?;
                let currency = json_str(item, "currency")
                    .or_else(|| json_str(item, "currency_code"))
                    .or_else(|| json_str(item, "price_currency"));
                Some(Self { amount, currency })
            }
            _ => item.get("total_item_price").and_then(Self::from_object),
        }
    }

    fn from_object(obj: &Value) -> Option<Self> {
        let amount = obj.get("amount").and_then(scalar_amount)?;
        let currency = json_str(obj, "currency_code").or_else(|| json_str(obj, "currency"));
        Some(Self { amount, currency })
    }
}

fn scalar_amount(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.currency {
            Some(currency) => write!(f, "{} {}", self.amount, currency),
            None => write!(f, "{}", self.amount),
        }
    }
}

/// A marketplace listing returned by a catalog query.
///
/// Identity is the listing id alone: two items with the same id are the
/// same listing even if other fields differ between fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub price: Option<Price>,
    pub size: Option<String>,
    pub condition: Option<String>,
    pub brand: Option<String>,
    pub photos: Vec<String>,
    pub url: Option<String>,
}

impl Item {
    /// Create an item with only an id and title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            price: None,
            size: None,
            condition: None,
            brand: None,
            photos: Vec::new(),
            url: None,
        }
    }

    /// Build an item from one catalog entry. Returns `None` when the entry has no id.
    pub fn from_json(value: &Value) -> Option<Self> {
        let id = value.get("id").and_then(json_id)?;

        let mut photos = Vec::new();
        if let Some(photo) = value.get("photo") {
            if let Some(url) = json_str(photo, "url").or_else(|| json_str(photo, "full_size_url")) {
                photos.push(url);
            }
        }
        if let Some(list) = value.get("photos").and_then(|v| v.as_array()) {
            for photo in list {
                if let Some(url) = json_str(photo, "url") {
                    if !photos.contains(&url) {
                        photos.push(url);
                    }
                }
            }
        }

        Some(Self {
            id,
            title: json_str(value, "title").unwrap_or_default(),
            price: Price::from_item_json(value),
            size: json_str(value, "size_title").or_else(|| json_title(value, "size")),
            condition: json_title(value, "status").or_else(|| json_title(value, "condition")),
            brand: json_str(value, "brand_title").or_else(|| json_title(value, "brand")),
            photos,
            url: json_str(value, "url").or_else(|| json_str(value, "path")),
        })
    }

    /// Absolute listing URL, resolving relative paths against `base_url`.
    pub fn permalink(&self, base_url: &str) -> Option<String> {
        self.url.as_ref().map(|url| {
            if url.starts_with("http://") || url.starts_with("https://") {
                url.clone()
            } else {
                format!("{}{}", base_url.trim_end_matches('/'), url)
            }
        })
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
