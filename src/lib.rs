//! listwatch - marketplace catalog watcher and messaging client.
//!
//! Polls a marketplace catalog for newly listed items, keeps a CSRF token
//! fresh for write calls, talks to the private messaging API and diffs the
//! inbox into show/hide notifications.
//!
//! Checkout automation is a library seam: the host supplies a
//! [`automation::CheckoutDriver`] for its page and calls
//! [`automation::run_if_pending`] after setting the auto-buy flag through
//! [`storage::LocalStore`].

pub mod api;
pub mod automation;
pub mod config;
pub mod error;
pub mod messaging;
pub mod models;
pub mod monitor;
pub mod notify;
pub mod storage;
pub mod token;

pub use error::{Error, Result};
