//! Session-held models for the ticket shop.

pub mod session;

pub use session::{CheckoutState, PAYMENT_STATUS_SUCCESS};
