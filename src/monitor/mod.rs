//! Catalog monitoring: item registry and poller.

mod poller;
mod registry;

pub use poller::{CycleOutcome, ItemSink, Poller, PollerState};
pub use registry::ItemRegistry;
