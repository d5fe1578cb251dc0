//! Entry point of the wizard.

use async_trait::async_trait;

use convention_core::shop::Order;

use super::{Phase, PhaseContext, PhaseError, PhaseForm, PhaseName};

pub struct WelcomePhase;

#[async_trait]
impl Phase for WelcomePhase {
    fn name(&self) -> PhaseName {
        PhaseName::Welcome
    }

    fn friendly_name(&self) -> &'static str {
        "Welcome"
    }

    fn prev_phase(&self) -> Option<PhaseName> {
        None
    }

    fn next_phase(&self) -> Option<PhaseName> {
        Some(PhaseName::Tickets)
    }

    async fn available(&self, _ctx: &PhaseContext<'_>, order: &Order) -> Result<bool, PhaseError> {
        Ok(!order.is_confirmed())
    }

    /// Persist the order so the following phases can attach to it.
    async fn save(
        &self,
        ctx: &PhaseContext<'_>,
        order: &Order,
        _form: &PhaseForm,
    ) -> Result<(), PhaseError> {
        let order = if order.id.is_some() {
            order.clone()
        } else {
            let created = ctx.store.create_order(ctx.event.id).await?;
            tracing::info!(order_id = ?created.id, "order created");
            created
        };
        ctx.set_order(&order).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Method;

    use super::*;
    use crate::phases::context::tests::Fixture;
    use crate::phases::{FormData, PhaseOutcome, RedirectTarget, dispatch};

    fn next() -> FormData {
        [("action", "next")].into_iter().collect()
    }

    #[tokio::test]
    async fn test_get_renders_for_fresh_session() {
        let fixture = Fixture::new().await;
        let outcome = dispatch(&WelcomePhase, &fixture.ctx(), &Method::GET, None)
            .await
            .unwrap();

        let PhaseOutcome::Render(page) = outcome else {
            panic!("expected a rendered page");
        };
        assert!(!page.order.confirmed);
        assert!(page.phases.iter().all(|p| !p.available));
        assert!(page.phases[0].current);
    }

    #[tokio::test]
    async fn test_next_creates_order_once() {
        let fixture = Fixture::new().await;
        let ctx = fixture.ctx();

        let outcome = dispatch(&WelcomePhase, &ctx, &Method::POST, Some(&next()))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            PhaseOutcome::Redirect(RedirectTarget::Phase(PhaseName::Tickets))
        ));
        let order = ctx.order().await.unwrap();
        assert!(order.id.is_some());
        assert!(ctx.is_phase_completed(Some(PhaseName::Welcome)).await.unwrap());

        dispatch(&WelcomePhase, &ctx, &Method::POST, Some(&next()))
            .await
            .unwrap();
        assert_eq!(ctx.order().await.unwrap().id, order.id);
        assert_eq!(fixture.store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_other_methods_are_rejected() {
        let fixture = Fixture::new().await;
        let result = dispatch(&WelcomePhase, &fixture.ctx(), &Method::PUT, None).await;
        assert!(matches!(result, Err(PhaseError::MethodNotAllowed { .. })));
        assert_eq!(fixture.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_action_is_an_error() {
        let fixture = Fixture::new().await;
        let data: FormData = [("action", "delete_everything")].into_iter().collect();
        let result = dispatch(&WelcomePhase, &fixture.ctx(), &Method::POST, Some(&data)).await;

        assert!(matches!(result, Err(PhaseError::InvalidAction(a)) if a == "delete_everything"));
        assert_eq!(fixture.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_action_cancels() {
        let fixture = Fixture::new().await;
        let ctx = fixture.ctx();
        dispatch(&WelcomePhase, &ctx, &Method::POST, Some(&next()))
            .await
            .unwrap();

        let outcome = dispatch(&WelcomePhase, &ctx, &Method::POST, Some(&FormData::default()))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            PhaseOutcome::Redirect(RedirectTarget::Homepage)
        ));
        assert_eq!(fixture.store.order_count().await, 0);
    }
}
