//! Types stored in the session during checkout.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use convention_core::{EventId, OrderId};

use crate::phases::PhaseName;

/// Payment status value reported by the payment provider on success.
pub const PAYMENT_STATUS_SUCCESS: i32 = 2;

/// Checkout progress for one event.
///
/// Completion markers belong to `order_id`; whenever the order changes or
/// disappears the whole state is replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutState {
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub completed: BTreeSet<PhaseName>,
}

impl CheckoutState {
    /// A state for a freshly saved order with nothing completed.
    #[must_use]
    pub fn for_order(order_id: OrderId) -> Self {
        Self {
            order_id: Some(order_id),
            completed: BTreeSet::new(),
        }
    }
}

/// Session keys for checkout data.
pub mod keys {
    use super::EventId;

    /// Key for the payment callback status flag.
    pub const PAYMENT_STATUS: &str = "payment_status";

    /// Key for the checkout state of one event.
    #[must_use]
    pub fn checkout(event_id: EventId) -> String {
        format!("tickets:{event_id}")
    }
}
