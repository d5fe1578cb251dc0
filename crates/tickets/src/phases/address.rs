//! Delivery address of the buyer.

use async_trait::async_trait;

use convention_core::shop::Order;

use super::forms::CustomerForm;
use super::{FormData, Phase, PhaseContext, PhaseError, PhaseForm, PhaseName};

pub struct AddressPhase;

#[async_trait]
impl Phase for AddressPhase {
    fn name(&self) -> PhaseName {
        PhaseName::Address
    }

    fn friendly_name(&self) -> &'static str {
        "Delivery address"
    }

    fn prev_phase(&self) -> Option<PhaseName> {
        Some(PhaseName::Tickets)
    }

    fn next_phase(&self) -> Option<PhaseName> {
        Some(PhaseName::Confirm)
    }

    async fn make_form(
        &self,
        ctx: &PhaseContext<'_>,
        order: &Order,
        data: Option<&FormData>,
    ) -> Result<PhaseForm, PhaseError> {
        let customer = match order.customer_id {
            Some(id) => ctx.store.customer(id).await?,
            None => None,
        };
        Ok(PhaseForm::Customer(Box::new(CustomerForm::new(
            customer.as_ref(),
            data,
        ))))
    }

    /// Save the customer and attach it to the order.
    async fn save(
        &self,
        ctx: &PhaseContext<'_>,
        order: &Order,
        form: &PhaseForm,
    ) -> Result<(), PhaseError> {
        let order_id = order.id.ok_or(PhaseError::OrderNotSaved)?;
        let PhaseForm::Customer(form) = form else {
            return Ok(());
        };
        let Some(input) = form.cleaned() else {
            return Ok(());
        };

        let customer = ctx.store.save_customer(order.customer_id, input).await?;
        ctx.store.set_order_customer(order_id, customer.id).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Method;

    use super::*;
    use crate::db::TicketStore;
    use crate::phases::context::tests::Fixture;
    use crate::phases::welcome::WelcomePhase;
    use crate::phases::{PhaseOutcome, RedirectTarget, dispatch};

    fn customer_data(first_name: &str) -> FormData {
        [
            ("action", "next"),
            ("first_name", first_name),
            ("last_name", "Testinen"),
            ("email", "tero@example.com"),
            ("phone", "+358 40 123 4567"),
            ("address", "Hervannan valtaväylä 1"),
            ("postal_code", "33720"),
            ("city", "Tampere"),
        ]
        .into_iter()
        .collect()
    }

    /// Fixture whose order has passed the welcome and tickets phases.
    async fn at_address() -> Fixture {
        let fixture = Fixture::new().await;
        let ctx = fixture.ctx();
        let next: FormData = [("action", "next")].into_iter().collect();
        dispatch(&WelcomePhase, &ctx, &Method::POST, Some(&next))
            .await
            .unwrap();
        ctx.complete_phase(PhaseName::Tickets).await.unwrap();
        fixture
    }

    #[tokio::test]
    async fn test_next_saves_and_attaches_customer() {
        let fixture = at_address().await;
        let ctx = fixture.ctx();

        let outcome = dispatch(&AddressPhase, &ctx, &Method::POST, Some(&customer_data("Tero")))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            PhaseOutcome::Redirect(RedirectTarget::Phase(PhaseName::Confirm))
        ));

        let order = ctx.order().await.unwrap();
        let customer = fixture
            .store
            .customer(order.customer_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(customer.full_name(), "Tero Testinen");
        assert_eq!(customer.phone.unwrap().as_str(), "+358 40 123 4567");
    }

    #[tokio::test]
    async fn test_resubmitting_updates_same_customer() {
        let fixture = at_address().await;
        let ctx = fixture.ctx();

        dispatch(&AddressPhase, &ctx, &Method::POST, Some(&customer_data("Tero")))
            .await
            .unwrap();
        let first = ctx.order().await.unwrap().customer_id;

        dispatch(&AddressPhase, &ctx, &Method::POST, Some(&customer_data("Teemu")))
            .await
            .unwrap();
        let order = ctx.order().await.unwrap();
        assert_eq!(order.customer_id, first);

        let customer = fixture.store.customer(first.unwrap()).await.unwrap().unwrap();
        assert_eq!(customer.first_name, "Teemu");
    }

    #[tokio::test]
    async fn test_get_prefills_saved_customer() {
        let fixture = at_address().await;
        let ctx = fixture.ctx();
        dispatch(&AddressPhase, &ctx, &Method::POST, Some(&customer_data("Tero")))
            .await
            .unwrap();

        let PhaseOutcome::Render(page) = dispatch(&AddressPhase, &ctx, &Method::GET, None)
            .await
            .unwrap()
        else {
            panic!("expected a rendered page");
        };
        let first_name = page.fields.iter().find(|f| f.name == "first_name").unwrap();
        assert_eq!(first_name.value, "Tero");
    }

    #[tokio::test]
    async fn test_invalid_customer_rerenders_with_errors() {
        let fixture = at_address().await;
        let ctx = fixture.ctx();

        let data: FormData = [("action", "next"), ("first_name", "Tero")]
            .into_iter()
            .collect();

        let PhaseOutcome::Render(page) = dispatch(&AddressPhase, &ctx, &Method::POST, Some(&data))
            .await
            .unwrap()
        else {
            panic!("expected a rendered page");
        };
        assert_eq!(page.errors, vec!["syntax"]);
        assert!(ctx.order().await.unwrap().customer_id.is_none());
        let email = page.fields.iter().find(|f| f.name == "email").unwrap();
        assert!(email.error.is_some());
    }
}
