//! Stand-in for the whole wizard while ticket sales are closed.

use async_trait::async_trait;

use convention_core::shop::Order;

use super::{Phase, PhaseContext, PhaseError, PhaseName, RedirectTarget};

pub struct ClosedPhase;

#[async_trait]
impl Phase for ClosedPhase {
    fn name(&self) -> PhaseName {
        PhaseName::Closed
    }

    fn friendly_name(&self) -> &'static str {
        "Welcome!"
    }

    fn prev_phase(&self) -> Option<PhaseName> {
        None
    }

    fn next_phase(&self) -> Option<PhaseName> {
        None
    }

    async fn available(&self, _ctx: &PhaseContext<'_>, _order: &Order) -> Result<bool, PhaseError> {
        Ok(true)
    }

    async fn next(&self, _ctx: &PhaseContext<'_>) -> Result<RedirectTarget, PhaseError> {
        Ok(RedirectTarget::Homepage)
    }
}
