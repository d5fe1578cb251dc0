//! Receipt shown after payment.

use async_trait::async_trait;

use convention_core::shop::Order;

use super::{Phase, PhaseContext, PhaseError, PhaseName, PhaseVars, RedirectTarget};

pub struct ThanksPhase;

#[async_trait]
impl Phase for ThanksPhase {
    fn name(&self) -> PhaseName {
        PhaseName::Thanks
    }

    fn friendly_name(&self) -> &'static str {
        "Thank you!"
    }

    fn prev_phase(&self) -> Option<PhaseName> {
        None
    }

    fn next_phase(&self) -> Option<PhaseName> {
        Some(PhaseName::Welcome)
    }

    fn next_text(&self) -> &'static str {
        "New order"
    }

    fn can_cancel(&self) -> bool {
        false
    }

    async fn available(&self, _ctx: &PhaseContext<'_>, order: &Order) -> Result<bool, PhaseError> {
        Ok(order.is_confirmed())
    }

    /// Start over with a new order. The confirmed one stays in storage.
    async fn next(&self, ctx: &PhaseContext<'_>) -> Result<RedirectTarget, PhaseError> {
        ctx.clear_order().await?;
        Ok(RedirectTarget::Phase(PhaseName::Welcome))
    }

    async fn cancel(&self, ctx: &PhaseContext<'_>) -> Result<RedirectTarget, PhaseError> {
        ctx.clear_order().await?;
        Ok(RedirectTarget::Homepage)
    }

    async fn vars(&self, ctx: &PhaseContext<'_>, order: &Order) -> Result<PhaseVars, PhaseError> {
        let lines = match order.id {
            Some(id) => ctx.store.order_lines(id, false).await?,
            None => Vec::new(),
        };
        Ok(PhaseVars { lines })
    }
}
