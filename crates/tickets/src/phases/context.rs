//! Per-request state shared by the phases.
//!
//! The session holds a [`CheckoutState`] per event: the current order and
//! the phases completed for it. All order bookkeeping of the wizard goes
//! through here.

use tower_sessions::Session;
use url::Url;

use convention_core::OrderId;
use convention_core::shop::{Event, Order};

use crate::db::TicketStore;
use crate::models::CheckoutState;
use crate::models::session::keys;

use super::{PhaseError, PhaseName, PhaseRegistry};

/// Everything a phase needs to handle a request.
pub struct PhaseContext<'a> {
    pub session: &'a Session,
    pub store: &'a dyn TicketStore,
    pub event: &'a Event,
    pub phases: &'a PhaseRegistry,
    /// Payment initiation endpoint.
    pub payment_url: &'a Url,
}

impl PhaseContext<'_> {
    fn key(&self) -> String {
        keys::checkout(self.event.id)
    }

    async fn checkout_state(&self) -> Result<CheckoutState, PhaseError> {
        Ok(self
            .session
            .get::<CheckoutState>(&self.key())
            .await?
            .unwrap_or_default())
    }

    async fn store_checkout_state(&self, state: &CheckoutState) -> Result<(), PhaseError> {
        self.session.insert(&self.key(), state).await?;
        Ok(())
    }

    /// The session's order for this event, or a fresh unsaved one.
    ///
    /// A session pointing at an order that no longer exists (or belongs to
    /// another event) is reset, along with its completion markers.
    pub async fn order(&self) -> Result<Order, PhaseError> {
        let state = self.checkout_state().await?;
        let Some(order_id) = state.order_id else {
            return Ok(Order::new(self.event.id));
        };

        match self.store.order(order_id).await? {
            Some(order) if order.event_id == self.event.id => Ok(order),
            _ => {
                tracing::info!(%order_id, "session order vanished, starting over");
                self.clear_order().await?;
                Ok(Order::new(self.event.id))
            }
        }
    }

    /// Make `order` the session's current order.
    ///
    /// # Errors
    ///
    /// Returns `PhaseError::OrderNotSaved` if the order has no ID yet.
    pub async fn set_order(&self, order: &Order) -> Result<(), PhaseError> {
        let order_id = order.id.ok_or(PhaseError::OrderNotSaved)?;
        let state = self.checkout_state().await?;
        if state.order_id == Some(order_id) {
            return Ok(());
        }
        self.store_checkout_state(&CheckoutState::for_order(order_id))
            .await
    }

    /// Forget the current order without touching storage.
    pub async fn clear_order(&self) -> Result<(), PhaseError> {
        self.session.remove::<CheckoutState>(&self.key()).await?;
        Ok(())
    }

    /// Delete the current order if it was never confirmed, then forget it.
    pub async fn destroy_order(&self) -> Result<(), PhaseError> {
        let order = self.order().await?;
        if let (Some(order_id), false) = (order.id, order.is_confirmed()) {
            self.store.delete_order(order_id).await?;
            tracing::info!(%order_id, "order destroyed");
        }
        self.clear_order().await
    }

    /// Whether `phase` has been completed for the current order.
    ///
    /// No phase (the entry point's predecessor) counts as completed.
    pub async fn is_phase_completed(&self, phase: Option<PhaseName>) -> Result<bool, PhaseError> {
        let Some(phase) = phase else {
            return Ok(true);
        };
        let state = self.checkout_state().await?;
        Ok(state.order_id.is_some() && state.completed.contains(&phase))
    }

    /// Mark `phase` completed for the current order.
    ///
    /// Without a saved order there is nothing to attach the marker to.
    pub async fn complete_phase(&self, phase: PhaseName) -> Result<(), PhaseError> {
        let mut state = self.checkout_state().await?;
        if state.order_id.is_none() {
            tracing::debug!(%phase, "no saved order, completion not recorded");
            return Ok(());
        }
        if state.completed.insert(phase) {
            self.store_checkout_state(&state).await?;
        }
        Ok(())
    }

    /// Consume the payment callback flag if it equals `expected`.
    ///
    /// Any other value is left in place.
    pub async fn take_payment_status(&self, expected: i32) -> Result<bool, PhaseError> {
        let status = self.session.get::<i32>(keys::PAYMENT_STATUS).await?;
        if status != Some(expected) {
            return Ok(false);
        }
        self.session.remove::<i32>(keys::PAYMENT_STATUS).await?;
        Ok(true)
    }

    /// Record the status reported by the payment provider.
    pub async fn set_payment_status(&self, status: i32) -> Result<(), PhaseError> {
        self.session.insert(keys::PAYMENT_STATUS, status).await?;
        Ok(())
    }

    /// Payment initiation URL for an order.
    #[must_use]
    pub fn payment_redirect(&self, order_id: OrderId) -> String {
        let mut url = self.payment_url.clone();
        url.query_pairs_mut()
            .append_pair("order", &order_id.to_string());
        url.into()
    }
}
