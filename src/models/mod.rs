//! Data models for listwatch.

mod conversation;
mod filter;
mod item;

pub use conversation::{Conversation, ConversationSummary, Message};
pub use filter::{FilterValue, SavedFilter};
pub use item::{Item, Price};

use serde_json::Value;

/// Read an identifier that the API may send as either a string or a number.
pub(crate) fn json_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read a non-empty string field.
pub(crate) fn json_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Read a string field that may also be nested as `{ "title": ... }`.
pub(crate) fn json_title(value: &Value, key: &str) -> Option<String> {
    match value.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(obj @ Value::Object(_)) => json_str(obj, "title").or_else(|| json_str(obj, "name")),
        _ => None,
    }
}
