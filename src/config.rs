//! Configuration management for listwatch using the prefer crate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default marketplace host.
pub const DEFAULT_BASE_URL: &str = "https://www.vinted.fr";

/// Brand filter applied when the monitored page has none.
pub const DEFAULT_BRAND_ID: &str = "53";

/// CSRF token lifetime before it is re-scraped.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 300;

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Marketplace base URL, without trailing slash.
    pub base_url: String,
    /// Directory holding local storage.
    pub data_dir: PathBuf,
    /// User agent: None for the default, "impersonate", or a custom string.
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Seconds between catalog polls.
    pub poll_interval_secs: u64,
    /// Maximum number of retained items.
    pub max_items: usize,
    pub default_brand_id: String,
    pub token_ttl_secs: u64,
    /// Seconds between inbox polls.
    pub message_poll_interval_secs: u64,
    pub inbox_per_page: u32,
    pub conversation_per_page: u32,
    /// Show popups for conversations already unread when the notifier starts.
    pub show_unread_on_start: bool,
    /// Raw `Cookie` header carrying the marketplace session.
    pub session_cookie: Option<String>,
    /// Externally supplied CSRF token, used before any scraping.
    pub csrf_token: Option<String>,
    /// Page fetched to recover a CSRF token after an authorization failure.
    pub token_page_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("listwatch");

        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            data_dir,
            user_agent: None,
            request_timeout: 30,
            poll_interval_secs: 10,
            max_items: 100,
            default_brand_id: DEFAULT_BRAND_ID.to_string(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            message_poll_interval_secs: 15,
            inbox_per_page: 20,
            conversation_per_page: 20,
            show_unread_on_start: false,
            session_cookie: None,
            csrf_token: None,
            token_page_path: "/inbox".to_string(),
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn message_poll_interval(&self) -> Duration {
        Duration::from_secs(self.message_poll_interval_secs.max(1))
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Path of the local key-value store.
    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join("storage.json")
    }

    /// Apply `LISTWATCH_*` environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(cookie) = std::env::var("LISTWATCH_COOKIE") {
            if !cookie.trim().is_empty() {
                self.session_cookie = Some(cookie);
            }
        }
        if let Ok(token) = std::env::var("LISTWATCH_CSRF_TOKEN") {
            if !token.trim().is_empty() {
                self.csrf_token = Some(token);
            }
        }
        if let Ok(base_url) = std::env::var("LISTWATCH_BASE_URL") {
            if !base_url.trim().is_empty() {
                self.base_url = base_url.trim_end_matches('/').to_string();
            }
        }
        self
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_brand_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_ttl_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_poll_interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inbox_per_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_per_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_unread_on_start: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_cookie: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_page_path: Option<String>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    pub async fn load() -> Self {
        match prefer::load("listwatch").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Ignoring unreadable config: {}", e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse config contents in the format named by `ext`.
    pub fn parse(contents: &str, ext: &str) -> Result<Self, String> {
        match ext {
            "toml" => toml::from_str(contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e)),
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref base_url) = self.base_url {
            settings.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = Some(user_agent.clone());
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(interval) = self.poll_interval_secs {
            settings.poll_interval_secs = interval;
        }
        if let Some(max) = self.max_items {
            settings.max_items = max;
        }
        if let Some(ref brand) = self.default_brand_id {
            settings.default_brand_id = brand.clone();
        }
        if let Some(ttl) = self.token_ttl_secs {
            settings.token_ttl_secs = ttl;
        }
        if let Some(interval) = self.message_poll_interval_secs {
            settings.message_poll_interval_secs = interval;
        }
        if let Some(per_page) = self.inbox_per_page {
            settings.inbox_per_page = per_page;
        }
        if let Some(per_page) = self.conversation_per_page {
            settings.conversation_per_page = per_page;
        }
        if let Some(show) = self.show_unread_on_start {
            settings.show_unread_on_start = show;
        }
        if let Some(ref cookie) = self.session_cookie {
            settings.session_cookie = Some(cookie.clone());
        }
        if let Some(ref token) = self.csrf_token {
            settings.csrf_token = Some(token.clone());
        }
        if let Some(ref path) = self.token_page_path {
            settings.token_page_path = path.clone();
        }
    }
}

/// Load settings from an explicit config path or by discovery, then apply env overrides.
pub async fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let config = match config_path {
        Some(path) => Config::load_from_path(path)
            .await
            .map_err(|e| anyhow::anyhow!(e))?,
        None => Config::load().await,
    };

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base_dir = config.base_dir().unwrap_or(cwd);

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    Ok(settings.with_env_overrides())
}
