//! Product selection.

use std::collections::HashMap;

use async_trait::async_trait;

use convention_core::ProductId;
use convention_core::shop::Order;

use super::forms::{OrderProductForm, multiform_save, multiform_validate};
use super::{
    FormData, Message, Phase, PhaseContext, PhaseError, PhaseForm, PhaseName, Validation,
    ValidationError,
};

pub struct TicketsPhase;

#[async_trait]
impl Phase for TicketsPhase {
    fn name(&self) -> PhaseName {
        PhaseName::Tickets
    }

    fn friendly_name(&self) -> &'static str {
        "Tickets"
    }

    fn prev_phase(&self) -> Option<PhaseName> {
        Some(PhaseName::Welcome)
    }

    fn next_phase(&self) -> Option<PhaseName> {
        Some(PhaseName::Address)
    }

    /// One form per product on sale, each bound to the order's line item.
    async fn make_form(
        &self,
        ctx: &PhaseContext<'_>,
        order: &Order,
        data: Option<&FormData>,
    ) -> Result<PhaseForm, PhaseError> {
        let order_id = order.id.ok_or(PhaseError::OrderNotSaved)?;
        let products = ctx.store.available_products(ctx.event.id).await?;

        let mut forms = Vec::with_capacity(products.len());
        for product in products {
            let order_product = ctx
                .store
                .get_or_create_order_product(order_id, product.id)
                .await?;
            forms.push(OrderProductForm::new(order_product, product, data));
        }

        Ok(PhaseForm::Products(forms))
    }

    async fn validate(
        &self,
        ctx: &PhaseContext<'_>,
        _order: &Order,
        form: &PhaseForm,
    ) -> Result<Validation, PhaseError> {
        let PhaseForm::Products(forms) = form else {
            return Ok(Validation::of_form(form));
        };

        let mut validation = multiform_validate(forms);
        // without clean counts the remaining checks mean nothing
        if !validation.is_valid() {
            return Ok(validation);
        }

        let requested: HashMap<ProductId, u32> = forms
            .iter()
            .filter_map(|f| f.cleaned_count().map(|count| (f.product_id(), count)))
            .collect();

        let total = requested
            .values()
            .fold(0_u32, |sum, count| sum.saturating_add(*count));
        if total == 0 {
            validation.push(
                ValidationError::Zero,
                Some(Message::info("Please select at least one product.")),
            );
        }

        if ctx.store.is_soldout(&requested).await? {
            validation.push(
                ValidationError::Soldout,
                Some(Message::error(
                    "Unfortunately a product you selected has just sold out.",
                )),
            );
        }

        Ok(validation)
    }

    async fn save(
        &self,
        ctx: &PhaseContext<'_>,
        _order: &Order,
        form: &PhaseForm,
    ) -> Result<(), PhaseError> {
        if let PhaseForm::Products(forms) = form {
            multiform_save(ctx.store, forms).await?;
        }
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

    /// Fixture with a saved order that has passed the welcome phase.
    async fn welcomed() -> Fixture {
        let fixture = Fixture::new().await;
        let next: FormData = [("action", "next")].into_iter().collect();
        dispatch(&WelcomePhase, &fixture.ctx(), &Method::POST, Some(&next))
            .await
            .unwrap();
        fixture
    }

    /// Form data for the fixture products, in the order the store lists them.
    async fn submission(fixture: &Fixture, action: &str, counts: [&str; 2]) -> FormData {
        let order_id = fixture.ctx().order().await.unwrap().id.unwrap();
        let mut fields = vec![("action".to_string(), action.to_string())];
        for (product, count) in fixture.products.iter().zip(counts) {
            let op = fixture
                .store
                .get_or_create_order_product(order_id, product.id)
                .await
                .unwrap();
            fields.push((format!("o{}-count", op.id), count.to_string()));
        }
        fields.into_iter().collect()
    }

    async fn saved_counts(fixture: &Fixture) -> Vec<u32> {
        let order_id = fixture.ctx().order().await.unwrap().id.unwrap();
        fixture
            .store
            .order_lines(order_id, false)
            .await
            .unwrap()
            .iter()
            .map(|l| l.order_product.count)
            .collect()
    }

    #[tokio::test]
    async fn test_skipping_welcome_redirects_to_first_phase() {
        let fixture = Fixture::new().await;
        let outcome = dispatch(&TicketsPhase, &fixture.ctx(), &Method::GET, None)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            PhaseOutcome::Redirect(RedirectTarget::Phase(PhaseName::Welcome))
        ));
    }

    #[tokio::test]
    async fn test_get_lists_available_products() {
        let fixture = welcomed().await;
        fixture
            .store
            .set_product_available(fixture.products[1].id, false)
            .await;

        let outcome = dispatch(&TicketsPhase, &fixture.ctx(), &Method::GET, None)
            .await
            .unwrap();
        let PhaseOutcome::Render(page) = outcome else {
            panic!("expected a rendered page");
        };
        assert_eq!(page.fields.len(), 1);
        assert_eq!(page.fields[0].label, "Weekend ticket");
        assert_eq!(page.fields[0].value, "0");
        assert!(page.phases[0].available);
        assert!(!page.phases[1].available);
    }

    #[tokio::test]
    async fn test_next_saves_counts() {
        let fixture = welcomed().await;
        let data = submission(&fixture, "next", ["1", "2"]).await;

        let outcome = dispatch(&TicketsPhase, &fixture.ctx(), &Method::POST, Some(&data))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            PhaseOutcome::Redirect(RedirectTarget::Phase(PhaseName::Address))
        ));
        assert_eq!(saved_counts(&fixture).await, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_all_zero_counts_yield_only_zero_marker() {
        let fixture = welcomed().await;
        let data = submission(&fixture, "next", ["0", "0"]).await;

        let outcome = dispatch(&TicketsPhase, &fixture.ctx(), &Method::POST, Some(&data))
            .await
            .unwrap();
        let PhaseOutcome::Render(page) = outcome else {
            panic!("expected a rendered page");
        };
        assert_eq!(page.errors, vec!["zero"]);
        assert_eq!(page.messages.len(), 1);
        assert!(
            !fixture
                .ctx()
                .is_phase_completed(Some(PhaseName::Tickets))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_soldout_blocks_and_saves_nothing() {
        let fixture = welcomed().await;
        // stock is 2
        let data = submission(&fixture, "next", ["3", "0"]).await;

        let outcome = dispatch(&TicketsPhase, &fixture.ctx(), &Method::POST, Some(&data))
            .await
            .unwrap();
        let PhaseOutcome::Render(page) = outcome else {
            panic!("expected a rendered page");
        };
        assert_eq!(page.errors, vec!["soldout"]);
        assert!(page.has_error("soldout"));
        assert_eq!(saved_counts(&fixture).await, vec![0, 0]);
    }

    #[tokio::test]
    async fn test_syntax_error_short_circuits() {
        let fixture = welcomed().await;
        let data = submission(&fixture, "next", ["lots", "0"]).await;

        let outcome = dispatch(&TicketsPhase, &fixture.ctx(), &Method::POST, Some(&data))
            .await
            .unwrap();
        let PhaseOutcome::Render(page) = outcome else {
            panic!("expected a rendered page");
        };
        assert_eq!(page.errors, vec!["syntax"]);
        assert_eq!(page.fields[0].value, "lots");
        assert!(page.fields[0].error.is_some());
    }

    #[tokio::test]
    async fn test_prev_ignores_invalid_data() {
        let fixture = welcomed().await;
        let data = submission(&fixture, "prev", ["lots", "-4"]).await;

        let outcome = dispatch(&TicketsPhase, &fixture.ctx(), &Method::POST, Some(&data))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            PhaseOutcome::Redirect(RedirectTarget::Phase(PhaseName::Welcome))
        ));
        assert_eq!(saved_counts(&fixture).await, vec![0, 0]);
    }

    #[tokio::test]
    async fn test_prev_does_not_persist_valid_data() {
        let fixture = welcomed().await;
        let data = submission(&fixture, "prev", ["1", "1"]).await;

        dispatch(&TicketsPhase, &fixture.ctx(), &Method::POST, Some(&data))
            .await
            .unwrap();
        assert_eq!(saved_counts(&fixture).await, vec![0, 0]);
    }

    #[tokio::test]
    async fn test_cancel_destroys_order_without_validation() {
        let fixture = welcomed().await;
        let data = submission(&fixture, "cancel", ["lots", "0"]).await;

        let outcome = dispatch(&TicketsPhase, &fixture.ctx(), &Method::POST, Some(&data))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            PhaseOutcome::Redirect(RedirectTarget::Homepage)
        ));
        assert_eq!(fixture.store.order_count().await, 0);
        assert!(fixture.ctx().order().await.unwrap().id.is_none());
    }
}
