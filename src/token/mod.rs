//! Time-boxed CSRF token cache.
//!
//! A token is reused while younger than the TTL. Once expired it is
//! re-acquired from, in order: a token captured passively from traffic,
//! inline page scripts, the raw page HTML, and the page's global data
//! object. When none of those yield one, callers fall back to
//! [`TokenProvider::refetch_token_from_page`].

pub mod extract;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::api::Transport;
use crate::error::Result;

/// Where a token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Cached,
    Captured,
    InlineScript,
    PageHtml,
    PageData,
    Refetched,
    Configured,
}

#[derive(Debug, Clone)]
struct CsrfToken {
    value: String,
    acquired_at: Instant,
}

/// Token cache with expiry. Time is passed in so expiry is testable.
#[derive(Debug, Clone)]
pub struct TokenCache {
    ttl: Duration,
    cached: Option<CsrfToken>,
    captured: Option<String>,
    page_html: Option<String>,
    /// Last value the server rejected; never handed out again by discovery.
    rejected: Option<String>,
}

impl TokenCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            cached: None,
            captured: None,
            page_html: None,
            rejected: None,
        }
    }

    /// Cache `value` as acquired at `now`.
    pub fn store(&mut self, value: impl Into<String>, now: Instant) {
        self.cached = Some(CsrfToken {
            value: value.into(),
            acquired_at: now,
        });
    }

    /// Record a token seen in passing (request or response headers).
    pub fn capture(&mut self, value: impl Into<String>) {
        let value = value.into();
        if !value.trim().is_empty() {
            self.captured = Some(value.trim().to_string());
        }
    }

    /// Remember the latest page document for script and HTML discovery.
    pub fn observe_page(&mut self, html: impl Into<String>) {
        self.page_html = Some(html.into());
    }

    /// Drop the cached token after the server rejected it.
    pub fn invalidate(&mut self) {
        if let Some(token) = self.cached.take() {
            self.rejected = Some(token.value);
        }
    }

    /// Cached token if still fresh, otherwise the first discovery match.
    pub fn get_token(&mut self, now: Instant) -> Option<String> {
        self.get_token_with_source(now).map(|(token, _)| token)
    }

    pub fn get_token_with_source(&mut self, now: Instant) -> Option<(String, TokenSource)> {
        if let Some(token) = &self.cached {
            if now.saturating_duration_since(token.acquired_at) < self.ttl {
                return Some((token.value.clone(), TokenSource::Cached));
            }
            debug!("CSRF token expired after {:?}", self.ttl);
            self.cached = None;
        }

        let (value, source) = self.discover()?;
        self.store(value.clone(), now);
        Some((value, source))
    }

    fn discover(&self) -> Option<(String, TokenSource)> {
        let usable = |token: &String| self.rejected.as_ref() != Some(token);

        if let Some(token) = self.captured.clone().filter(usable) {
            return Some((token, TokenSource::Captured));
        }

        let html = self.page_html.as_deref()?;
        let candidates: [(fn(&str) -> Option<String>, TokenSource); 3] = [
            (extract::token_from_inline_scripts, TokenSource::InlineScript),
            (extract::token_from_html, TokenSource::PageHtml),
            (extract::token_from_page_data, TokenSource::PageData),
        ];
        candidates
            .iter()
            .find_map(|(find, source)| find(html).filter(usable).map(|t| (t, *source)))
    }
}

/// Shared token cache bound to a transport for page refetches.
#[derive(Clone)]
pub struct TokenProvider {
    cache: Arc<Mutex<TokenCache>>,
    transport: Arc<dyn Transport>,
    page_path: String,
}

impl TokenProvider {
    pub fn new(transport: Arc<dyn Transport>, ttl: Duration, page_path: impl Into<String>) -> Self {
        Self {
            cache: Arc::new(Mutex::new(TokenCache::new(ttl))),
            transport,
            page_path: page_path.into(),
        }
    }

    /// Seed the cache with an externally supplied token.
    pub async fn seed(&self, token: &str) {
        self.cache.lock().await.store(token, Instant::now());
        debug!("Using {:?} CSRF token", TokenSource::Configured);
    }

    /// Current token from cache or passive discovery; no network call.
    pub async fn get_token(&self) -> Option<String> {
        let observed = self.transport.observed_csrf_token().await;
        let mut cache = self.cache.lock().await;
        if let Some(token) = observed {
            cache.capture(token);
        }
        let (token, source) = cache.get_token_with_source(Instant::now())?;
        if source != TokenSource::Cached {
            debug!("CSRF token acquired from {:?}", source);
        }
        Some(token)
    }

    /// Fetch a fresh page and scrape a token from it.
    ///
    /// Used when the cache is empty or a write was rejected. The page is
    /// also kept for later discovery.
    pub async fn refetch_token_from_page(&self) -> Result<Option<String>> {
        let html = self.transport.get_page(&self.page_path).await?;
        let token = extract::token_from_document(&html);

        let mut cache = self.cache.lock().await;
        cache.observe_page(html);
        match &token {
            Some(value) => {
                cache.store(value.clone(), Instant::now());
                info!("CSRF token {:?} from {}", TokenSource::Refetched, self.page_path);
            }
            None => debug!("No CSRF token on {}", self.page_path),
        }
        Ok(token)
    }

    pub async fn invalidate(&self) {
        self.cache.lock().await.invalidate();
    }
}
