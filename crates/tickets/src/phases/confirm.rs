//! Order review before payment.
//!
//! Leaving this phase sends the buyer to the payment provider. The order is
//! confirmed later, when the provider's callback has set the payment flag
//! and the buyer lands back here.

use std::collections::HashMap;

use async_trait::async_trait;

use convention_core::ProductId;
use convention_core::shop::Order;

use super::{
    Phase, PhaseContext, PhaseError, PhaseForm, PhaseName, PhaseVars, RedirectTarget, Validation,
    ValidationError,
};

pub struct ConfirmPhase;

#[async_trait]
impl Phase for ConfirmPhase {
    fn name(&self) -> PhaseName {
        PhaseName::Confirm
    }

    fn friendly_name(&self) -> &'static str {
        "Confirmation"
    }

    fn prev_phase(&self) -> Option<PhaseName> {
        Some(PhaseName::Address)
    }

    fn next_phase(&self) -> Option<PhaseName> {
        Some(PhaseName::Thanks)
    }

    fn next_text(&self) -> &'static str {
        "Proceed to payment ✓"
    }

    fn payment_phase(&self) -> bool {
        true
    }

    /// Stock may have run out since the tickets phase.
    async fn validate(
        &self,
        ctx: &PhaseContext<'_>,
        order: &Order,
        form: &PhaseForm,
    ) -> Result<Validation, PhaseError> {
        let mut validation = Validation::of_form(form);
        let order_id = order.id.ok_or(PhaseError::OrderNotSaved)?;

        let requested: HashMap<ProductId, u32> = ctx
            .store
            .order_lines(order_id, true)
            .await?
            .iter()
            .map(|line| (line.product.id, line.order_product.count))
            .collect();

        if ctx.store.is_soldout(&requested).await? {
            validation.push(ValidationError::SoldoutConfirm, None);
        }
        Ok(validation)
    }

    async fn next(&self, ctx: &PhaseContext<'_>) -> Result<RedirectTarget, PhaseError> {
        let order = ctx.order().await?;
        if order.is_confirmed() {
            return Ok(RedirectTarget::Phase(PhaseName::Thanks));
        }
        let order_id = order.id.ok_or(PhaseError::OrderNotSaved)?;
        tracing::info!(%order_id, "sending buyer to payment");
        Ok(RedirectTarget::External(ctx.payment_redirect(order_id)))
    }

    async fn vars(&self, ctx: &PhaseContext<'_>, order: &Order) -> Result<PhaseVars, PhaseError> {
        let lines = match order.id {
            Some(id) => ctx.store.order_lines(id, true).await?,
            None => Vec::new(),
        };
        Ok(PhaseVars { lines })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Method;

    use super::*;
    use crate::db::TicketStore;
    use crate::models::PAYMENT_STATUS_SUCCESS;
    use crate::phases::context::tests::Fixture;
    use crate::phases::address::AddressPhase;
    use crate::phases::thanks::ThanksPhase;
    use crate::phases::{FormData, LAST_PHASE, PhaseOutcome, dispatch};

    /// Fixture with an order of two weekend tickets, ready for confirmation.
    async fn at_confirm() -> Fixture {
        let fixture = Fixture::new().await;
        let ctx = fixture.ctx();
        let order = fixture.store.create_order(fixture.event.id).await.unwrap();
        let order_id = order.id.unwrap();
        ctx.set_order(&order).await.unwrap();

        let weekend = fixture.products[0].id;
        let saturday = fixture.products[1].id;
        let line = fixture
            .store
            .get_or_create_order_product(order_id, weekend)
            .await
            .unwrap();
        fixture
            .store
            .get_or_create_order_product(order_id, saturday)
            .await
            .unwrap();
        fixture
            .store
            .save_order_products(&[(line.id, 2)])
            .await
            .unwrap();

        for phase in [PhaseName::Welcome, PhaseName::Tickets, PhaseName::Address] {
            ctx.complete_phase(phase).await.unwrap();
        }
        fixture
    }

    fn next() -> FormData {
        [("action", "next")].into_iter().collect()
    }

    #[tokio::test]
    async fn test_get_shows_only_selected_lines() {
        let fixture = at_confirm().await;
        let PhaseOutcome::Render(page) = dispatch(&ConfirmPhase, &fixture.ctx(), &Method::GET, None)
            .await
            .unwrap()
        else {
            panic!("expected a rendered page");
        };
        assert_eq!(page.lines.len(), 1);
        assert_eq!(page.lines[0].count, 2);
        assert_eq!(page.order.total, "70.00 €");
        assert!(page.phase.payment_phase);
    }

    #[tokio::test]
    async fn test_next_redirects_to_payment() {
        let fixture = at_confirm().await;
        let ctx = fixture.ctx();
        let order_id = ctx.order().await.unwrap().id.unwrap();

        let outcome = dispatch(&ConfirmPhase, &ctx, &Method::POST, Some(&next()))
            .await
            .unwrap();
        let PhaseOutcome::Redirect(RedirectTarget::External(url)) = outcome else {
            panic!("expected a payment redirect");
        };
        assert_eq!(url, format!("http://localhost:8000/process/?order={order_id}"));
        assert!(!ctx.order().await.unwrap().is_confirmed());
    }

    #[tokio::test]
    async fn test_stock_gone_since_tickets_blocks_payment() {
        let fixture = at_confirm().await;
        let ctx = fixture.ctx();

        // someone else bought the last weekend tickets
        let other = fixture.store.create_order(fixture.event.id).await.unwrap();
        let other_id = other.id.unwrap();
        let line = fixture
            .store
            .get_or_create_order_product(other_id, fixture.products[0].id)
            .await
            .unwrap();
        fixture.store.save_order_products(&[(line.id, 1)]).await.unwrap();
        fixture.store.confirm_order(other_id).await.unwrap();

        let PhaseOutcome::Render(page) = dispatch(&ConfirmPhase, &ctx, &Method::POST, Some(&next()))
            .await
            .unwrap()
        else {
            panic!("expected a rendered page");
        };
        assert_eq!(page.errors, vec!["soldout_confirm"]);
    }

    #[tokio::test]
    async fn test_payment_callback_confirms_once() {
        let fixture = at_confirm().await;
        let ctx = fixture.ctx();

        ctx.set_payment_status(PAYMENT_STATUS_SUCCESS).await.unwrap();
        let outcome = dispatch(&ConfirmPhase, &ctx, &Method::GET, None)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            PhaseOutcome::Redirect(RedirectTarget::Phase(PhaseName::Thanks))
        ));
        let order = ctx.order().await.unwrap();
        assert!(order.is_confirmed());
        assert!(ctx.is_phase_completed(Some(PhaseName::Confirm)).await.unwrap());

        // flag consumed: the confirmed order is forwarded to thanks
        let again = dispatch(&ConfirmPhase, &ctx, &Method::GET, None)
            .await
            .unwrap();
        assert!(matches!(
            again,
            PhaseOutcome::Redirect(RedirectTarget::Phase(PhaseName::Thanks))
        ));

        let PhaseOutcome::Render(page) = dispatch(&ThanksPhase, &ctx, &Method::GET, None)
            .await
            .unwrap()
        else {
            panic!("expected a rendered page");
        };
        assert!(page.order.confirmed);

        let again = fixture.store.order(order.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(again.confirmed_at, order.confirmed_at);
    }

    #[tokio::test]
    async fn test_replayed_flag_on_confirmed_order_goes_to_confirm() {
        let fixture = at_confirm().await;
        let ctx = fixture.ctx();

        ctx.set_payment_status(PAYMENT_STATUS_SUCCESS).await.unwrap();
        dispatch(&ConfirmPhase, &ctx, &Method::GET, None)
            .await
            .unwrap();

        ctx.set_payment_status(PAYMENT_STATUS_SUCCESS).await.unwrap();
        let outcome = dispatch(&ThanksPhase, &ctx, &Method::GET, None)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            PhaseOutcome::Redirect(RedirectTarget::Phase(PhaseName::Confirm))
        ));
        assert!(!ctx.take_payment_status(PAYMENT_STATUS_SUCCESS).await.unwrap());
    }

    #[tokio::test]
    async fn test_confirmed_order_is_sent_to_thanks() {
        let fixture = at_confirm().await;
        let ctx = fixture.ctx();
        let order_id = ctx.order().await.unwrap().id.unwrap();
        fixture.store.confirm_order(order_id).await.unwrap();

        for phase in [&ConfirmPhase as &dyn Phase, &AddressPhase] {
            let outcome = dispatch(phase, &ctx, &Method::GET, None).await.unwrap();
            assert!(matches!(
                outcome,
                PhaseOutcome::Redirect(RedirectTarget::Phase(PhaseName::Thanks))
            ));
        }
    }

    #[tokio::test]
    async fn test_confirmed_order_with_skipped_phase_goes_to_last_phase() {
        let fixture = Fixture::new().await;
        let ctx = fixture.ctx();
        let order = fixture.store.create_order(fixture.event.id).await.unwrap();
        let order = fixture.store.confirm_order(order.id.unwrap()).await.unwrap();
        ctx.set_order(&order).await.unwrap();

        let outcome = dispatch(&ConfirmPhase, &ctx, &Method::GET, None)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            PhaseOutcome::Redirect(RedirectTarget::Phase(LAST_PHASE))
        ));

        // the last phase itself never points back at itself
        let outcome = dispatch(&AddressPhase, &ctx, &Method::GET, None)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            PhaseOutcome::Redirect(RedirectTarget::Phase(PhaseName::Thanks))
        ));
    }
}
