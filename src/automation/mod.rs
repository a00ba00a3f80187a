//! Checkout automation driven through a page driver.

mod checkout;
mod wait;

pub use checkout::{
    choose_pickup_point, run_if_pending, CheckoutDriver, CheckoutOptions, CheckoutSequence,
    CheckoutStage,
};
pub use wait::wait_until;
