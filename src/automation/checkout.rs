//! Named-stage checkout sequence.
//!
//! The sequence only advances; `stage` is the single source of truth and
//! every step waits for the page before acting on it.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::wait::wait_until;
use crate::error::{Error, Result};
use crate::storage::LocalStore;

/// Page operations the checkout sequence needs.
#[async_trait]
pub trait CheckoutDriver: Send + Sync {
    /// Whether the purchase button is on the page yet.
    async fn purchase_button_visible(&self) -> Result<bool>;
    async fn scroll_to_purchase(&self) -> Result<()>;
    /// Click the purchase button. True once the checkout view opened.
    async fn click_primary(&self) -> Result<bool>;
    /// Pointer down/up on the purchase button for handlers that ignore
    /// plain clicks.
    async fn dispatch_pointer_events(&self) -> Result<()>;
    /// Names of the pickup points currently offered.
    async fn pickup_points(&self) -> Result<Vec<String>>;
    async fn select_pickup_point(&self, index: usize) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutStage {
    Idle,
    Scrolled,
    PrimaryClickSent,
    PointerEventsSent,
    PickupSelected,
    Completed,
    Failed(String),
}

impl CheckoutStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutStage::Completed | CheckoutStage::Failed(_))
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutOptions {
    /// How long to wait for each page element.
    pub element_timeout: Duration,
    pub poll_interval: Duration,
    pub click_attempts: u32,
    pub click_retry_delay: Duration,
}

impl Default for CheckoutOptions {
    fn default() -> Self {
        Self {
            element_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
            click_attempts: 3,
            click_retry_delay: Duration::from_millis(500),
        }
    }
}

/// Index of the pickup point to choose: the first priority name found
/// (case-insensitive substring) among `available`, else the first one.
pub fn choose_pickup_point(available: &[String], priorities: &[String]) -> Option<usize> {
    let names: Vec<String> = available.iter().map(|name| name.to_lowercase()).collect();
    priorities
        .iter()
        .map(|wanted| wanted.trim().to_lowercase())
        .filter(|wanted| !wanted.is_empty())
        .find_map(|wanted| names.iter().position(|name| name.contains(&wanted)))
        .or_else(|| (!available.is_empty()).then_some(0))
}

pub struct CheckoutSequence<D> {
    driver: D,
    pickup_priorities: Vec<String>,
    options: CheckoutOptions,
    stage: CheckoutStage,
}

impl<D: CheckoutDriver> CheckoutSequence<D> {
    pub fn new(driver: D, pickup_priorities: Vec<String>, options: CheckoutOptions) -> Self {
        Self {
            driver,
            pickup_priorities,
            options,
            stage: CheckoutStage::Idle,
        }
    }

    pub fn stage(&self) -> &CheckoutStage {
        &self.stage
    }

    /// Run the whole sequence. On failure the stage becomes `Failed` and
    /// the reason is returned as [`Error::Automation`].
    pub async fn run(&mut self) -> Result<CheckoutStage> {
        if self.stage != CheckoutStage::Idle {
            return Err(Error::Automation(format!(
                "checkout already ran ({:?})",
                self.stage
            )));
        }

        match self.drive().await {
            Ok(()) => {
                self.advance(CheckoutStage::Completed);
                info!("Checkout sequence completed");
                Ok(self.stage.clone())
            }
            Err(e) => {
                let reason = match e {
                    Error::Automation(reason) => reason,
                    other => other.to_string(),
                };
                warn!("Checkout stopped at {:?}: {}", self.stage, reason);
                self.stage = CheckoutStage::Failed(reason.clone());
                Err(Error::Automation(reason))
            }
        }
    }

    async fn drive(&mut self) -> Result<()> {
        let timeout = self.options.element_timeout;
        let interval = self.options.poll_interval;

        let driver = &self.driver;
        wait_until(
            move || async move {
                driver
                    .purchase_button_visible()
                    .await
                    .unwrap_or(false)
                    .then_some(())
            },
            timeout,
            interval,
        )
        .await
        .ok_or_else(|| Error::Automation("purchase button not found".to_string()))?;

        self.driver.scroll_to_purchase().await?;
        self.advance(CheckoutStage::Scrolled);

        self.click_primary().await?;
        self.advance(CheckoutStage::PrimaryClickSent);

        self.driver.dispatch_pointer_events().await?;
        self.advance(CheckoutStage::PointerEventsSent);

        let driver = &self.driver;
        let available = wait_until(
            move || async move {
                driver
                    .pickup_points()
                    .await
                    .ok()
                    .filter(|points| !points.is_empty())
            },
            timeout,
            interval,
        )
        .await
        .ok_or_else(|| Error::Automation("no pickup point offered".to_string()))?;

        let index = choose_pickup_point(&available, &self.pickup_priorities)
            .ok_or_else(|| Error::Automation("no pickup point offered".to_string()))?;
        debug!("Choosing pickup point {:?}", available[index]);
        self.driver.select_pickup_point(index).await?;
        self.advance(CheckoutStage::PickupSelected);

        Ok(())
    }

    async fn click_primary(&self) -> Result<()> {
        let attempts = self.options.click_attempts.max(1);
        for attempt in 1..=attempts {
            if self.driver.click_primary().await? {
                return Ok(());
            }
            debug!("Purchase click {}/{} did not open checkout", attempt, attempts);
            if attempt < attempts {
                tokio::time::sleep(self.options.click_retry_delay).await;
            }
        }
        Err(Error::Automation(format!(
            "purchase click had no effect after {} attempts",
            attempts
        )))
    }

    fn advance(&mut self, next: CheckoutStage) {
        debug!("Checkout {:?} -> {:?}", self.stage, next);
        self.stage = next;
    }
}

/// Consume the auto-buy flag and run the checkout if it was still valid.
///
/// Returns `None` when no valid request was pending.
pub async fn run_if_pending<D: CheckoutDriver>(
    store: &LocalStore,
    driver: D,
    options: CheckoutOptions,
) -> Result<Option<CheckoutStage>> {
    if !store.take_auto_buy_pending()? {
        return Ok(None);
    }
    let priorities = store.pickup_points()?;
    let mut sequence = CheckoutSequence::new(driver, priorities, options);
    sequence.run().await.map(Some)
}
