//! Inbox notifications: unread diffing and the popup poller.

mod poller;
mod tracker;

pub use poller::{InboxCycle, InboxSource, NotificationPoller, PopupSink};
pub use tracker::{InboxTracker, NotificationDiff};
