//! Local key-value storage in a single JSON file.
//!
//! Keys: `savedFilters` (list of saved filters), `autoBuyPending` (a
//! short-lived checkout flag) and `pickupPoints` (prioritized relay point
//! names). Unknown keys are preserved on rewrite.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::SavedFilter;

/// How long an auto-buy request stays valid.
pub const AUTO_BUY_WINDOW_SECS: i64 = 60;

/// Checkout flag left for the automation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoBuyPending {
    pub pending: bool,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
}

impl AutoBuyPending {
    /// True when set and no older than the validity window.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let age = now.timestamp_millis() - self.timestamp;
        self.pending && (0..=AUTO_BUY_WINDOW_SECS * 1000).contains(&age)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageFile {
    #[serde(default)]
    saved_filters: Vec<SavedFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auto_buy_pending: Option<AutoBuyPending>,
    #[serde(default)]
    pickup_points: Vec<String>,
    #[serde(flatten)]
    other: Map<String, Value>,
}

/// JSON file store. Every operation reads and rewrites the whole file.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<StorageFile> {
        if !self.path.exists() {
            return Ok(StorageFile::default());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(StorageFile::default());
        }
        serde_json::from_str(&contents)
            .map_err(|e| Error::Storage(format!("{}: {}", self.path.display(), e)))
    }

    fn write(&self, file: &StorageFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(file)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update<T>(&self, f: impl FnOnce(&mut StorageFile) -> T) -> Result<T> {
        let mut file = self.read()?;
        let out = f(&mut file);
        self.write(&file)?;
        Ok(out)
    }

    /// Capture the query of `page_url` as a new saved filter.
    pub fn save_filter(&self, name: &str, page_url: &str) -> Result<SavedFilter> {
        self.save_filter_at(name, page_url, Utc::now())
    }

    pub fn save_filter_at(
        &self,
        name: &str,
        page_url: &str,
        now: DateTime<Utc>,
    ) -> Result<SavedFilter> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("filter name is empty".to_string()));
        }
        let filter = SavedFilter::capture(name, page_url, now)?;
        let saved = filter.clone();
        self.update(move |file| file.saved_filters.push(filter))?;
        debug!("Saved filter {} ({})", saved.name, saved.id);
        Ok(saved)
    }

    pub fn list_filters(&self) -> Result<Vec<SavedFilter>> {
        Ok(self.read()?.saved_filters)
    }

    pub fn get_filter(&self, id: &str) -> Result<Option<SavedFilter>> {
        Ok(self
            .read()?
            .saved_filters
            .into_iter()
            .find(|filter| filter.id == id))
    }

    /// Remove a filter. False when no filter has that id.
    pub fn delete_filter(&self, id: &str) -> Result<bool> {
        let mut file = self.read()?;
        let before = file.saved_filters.len();
        file.saved_filters.retain(|filter| filter.id != id);
        if file.saved_filters.len() == before {
            return Ok(false);
        }
        self.write(&file)?;
        Ok(true)
    }

    /// Catalog URL for a saved filter on `catalog_url`.
    pub fn filter_url(&self, filter: &SavedFilter, catalog_url: &str) -> Result<String> {
        filter.to_url(catalog_url)
    }

    pub fn set_auto_buy_pending(&self) -> Result<()> {
        self.set_auto_buy_pending_at(Utc::now())
    }

    pub fn set_auto_buy_pending_at(&self, now: DateTime<Utc>) -> Result<()> {
        self.update(|file| {
            file.auto_buy_pending = Some(AutoBuyPending {
                pending: true,
                timestamp: now.timestamp_millis(),
            })
        })
    }

    /// Consume the auto-buy flag. True only if it was set within the
    /// window; the flag is cleared either way.
    pub fn take_auto_buy_pending(&self) -> Result<bool> {
        self.take_auto_buy_pending_at(Utc::now())
    }

    pub fn take_auto_buy_pending_at(&self, now: DateTime<Utc>) -> Result<bool> {
        let mut file = self.read()?;
        let Some(flag) = file.auto_buy_pending.take() else {
            return Ok(false);
        };
        self.write(&file)?;
        let valid = flag.is_valid_at(now);
        if flag.pending && !valid {
            debug!("Ignoring expired auto-buy flag");
        }
        Ok(valid)
    }

    pub fn pickup_points(&self) -> Result<Vec<String>> {
        Ok(self.read()?.pickup_points)
    }

    /// Replace the prioritized pickup point names. Blank names are dropped.
    pub fn set_pickup_points(&self, names: &[String]) -> Result<()> {
        let names: Vec<String> = names
            .iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        self.update(|file| file.pickup_points = names)
    }
}
