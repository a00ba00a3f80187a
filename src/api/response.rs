//! API response wrapper.

use serde_json::Value;

use crate::error::{Error, Result};

/// Error code the marketplace returns in a JSON body for a bad CSRF token.
pub const INVALID_AUTHENTICITY_TOKEN_CODE: i64 = 106;

/// Buffered API response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub url: String,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            url: url.into(),
            body: body.into(),
        }
    }

    /// Check if the response is successful.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Error code from a JSON error body, if any.
    pub fn error_code(&self) -> Option<i64> {
        serde_json::from_str::<Value>(&self.body)
            .ok()
            .and_then(|v| v.get("code").and_then(|c| c.as_i64()))
    }

    /// Whether the server rejected the call's credentials.
    pub fn is_authorization_denied(&self) -> bool {
        self.status == 403 || self.error_code() == Some(INVALID_AUTHENTICITY_TOKEN_CODE)
    }

    /// Parse the body as JSON, failing with `Error::Network` on a non-success status.
    pub fn into_json(self) -> Result<Value> {
        if !self.is_success() {
            return Err(Error::Network {
                status: self.status,
                url: self.url,
            });
        }
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&self.body)?)
    }
}
