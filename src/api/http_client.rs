//! HTTP client for the marketplace host.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE};
use reqwest::Client;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use super::response::ApiResponse;
use super::user_agent::resolve_user_agent;
use super::Transport;
use crate::config::Settings;
use crate::error::{Error, Result};

/// Header carrying the CSRF token on write calls.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// HTTP client with session cookies and passive CSRF token capture.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    /// Last CSRF token seen in a response header.
    observed_token: Arc<Mutex<Option<String>>>,
}

impl HttpClient {
    /// Create a client from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            &settings.base_url,
            settings.request_timeout(),
            settings.user_agent.as_deref(),
            settings.session_cookie.as_deref(),
        )
    }

    /// Create a new HTTP client.
    /// - `user_agent_config`: None, "impersonate" or a custom string
    /// - `session_cookie`: raw `Cookie` header sent with every request
    pub fn new(
        base_url: &str,
        timeout: Duration,
        user_agent_config: Option<&str>,
        session_cookie: Option<&str>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        if let Some(cookie) = session_cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| Error::Config(format!("Invalid session cookie: {}", e)))?;
            headers.insert(COOKIE, value);
        }

        let client = Client::builder()
            .user_agent(resolve_user_agent(user_agent_config))
            .default_headers(headers)
            .cookie_store(true)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            observed_token: Arc::new(Mutex::new(None)),
        })
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    async fn finish(
        &self,
        method: &str,
        url: String,
        response: reqwest::Response,
        start: Instant,
    ) -> Result<ApiResponse> {
        let status = response.status().as_u16();

        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.to_string(), v.to_string());
            }
        }
        self.capture_token(&headers).await;

        let body = response.text().await?;
        debug!(
            "{} {} -> {} in {}ms",
            method,
            url,
            status,
            start.elapsed().as_millis()
        );
        Ok(ApiResponse::new(status, url, body))
    }

    /// Remember a CSRF token the server handed out in a header.
    async fn capture_token(&self, headers: &HashMap<String, String>) {
        if let Some(token) = headers.get(CSRF_HEADER).map(|t| t.trim()) {
            if !token.is_empty() {
                *self.observed_token.lock().await = Some(token.to_string());
            }
        }
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<ApiResponse> {
        let url = self.url(path);
        let start = Instant::now();
        let response = self.client.get(&url).query(query).send().await?;
        self.finish("GET", url, response, start).await
    }

    async fn post_json(&self, path: &str, body: &Value, csrf_token: &str) -> Result<ApiResponse> {
        let url = self.url(path);
        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .header(CSRF_HEADER, csrf_token)
            .json(body)
            .send()
            .await?;
        self.finish("POST", url, response, start).await
    }

    async fn get_page(&self, path: &str) -> Result<String> {
        let url = self.url(path);
        let start = Instant::now();
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await?;
        let page = self.finish("GET", url, response, start).await?;
        if !page.is_success() {
            return Err(Error::Network {
                status: page.status,
                url: page.url,
            });
        }
        Ok(page.body)
    }

    async fn observed_csrf_token(&self) -> Option<String> {
        self.observed_token.lock().await.clone()
    }
}
