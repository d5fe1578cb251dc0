//! Purchase wizard handlers.

use axum::{
    Form,
    extract::{FromRequest, Path, Query, Request, State},
    http::Method,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use convention_core::shop::Event;

use crate::error::{AppError, Result};
use crate::phases::{FormData, PhaseContext, PhaseName, PhaseOutcome, RedirectTarget, dispatch};
use crate::state::AppState;

/// Query string of the payment provider's return redirect.
#[derive(Debug, Deserialize)]
pub struct PaymentReturn {
    pub status: i32,
}

async fn find_event(state: &AppState, slug: &str) -> Result<Event> {
    state
        .event(slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event {slug}")))
}

fn context<'a>(state: &'a AppState, session: &'a Session, event: &'a Event) -> PhaseContext<'a> {
    PhaseContext {
        session,
        store: state.store(),
        event,
        phases: state.phases(),
        payment_url: &state.config().payment_url,
    }
}

/// Absolute or root-relative URL for a redirect target.
fn redirect_url(event: &Event, target: RedirectTarget) -> String {
    match target {
        RedirectTarget::Phase(name) => name.url(&event.slug),
        RedirectTarget::Homepage => event.homepage_url.clone(),
        RedirectTarget::External(url) => url,
    }
}

/// Serve one phase of the wizard.
///
/// # Errors
///
/// Returns 404 for an unknown event or phase, 405 for methods the phase does
/// not accept and 400 for a malformed submission or unknown action.
#[instrument(skip(state, session, request), fields(event = %event_slug, phase = %phase_slug))]
pub async fn phase(
    State(state): State<AppState>,
    Path((event_slug, phase_slug)): Path<(String, String)>,
    session: Session,
    request: Request,
) -> Result<Response> {
    let name = PhaseName::from_slug(&phase_slug)
        .ok_or_else(|| AppError::NotFound(format!("phase {phase_slug}")))?;
    let event = find_event(&state, &event_slug).await?;
    let phase = state
        .phases()
        .resolve(name, &event)
        .ok_or_else(|| AppError::NotFound(format!("phase {phase_slug}")))?;

    let method = request.method().clone();
    let data = if method == Method::POST {
        let Form(data) = Form::<FormData>::from_request(request, &state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Some(data)
    } else {
        None
    };

    let ctx = context(&state, &session, &event);
    let outcome = dispatch(phase, &ctx, &method, data.as_ref()).await?;

    Ok(match outcome {
        PhaseOutcome::Redirect(target) => {
            Redirect::to(&redirect_url(&event, target)).into_response()
        }
        PhaseOutcome::Render(page) => page.into_response(),
    })
}

/// Record the payment provider's verdict and return to the confirm phase.
///
/// The confirm phase picks the flag up on its next GET.
///
/// `status` is taken as given: nothing here checks that the provider sent
/// it. Deployments must route this path only from a verified gateway
/// callback, otherwise any client can confirm an unpaid order.
///
/// # Errors
///
/// Returns 404 for an unknown event.
#[instrument(skip(state, session, query), fields(event = %event_slug, status = query.status))]
pub async fn payment_return(
    State(state): State<AppState>,
    Path(event_slug): Path<String>,
    session: Session,
    Query(query): Query<PaymentReturn>,
) -> Result<Redirect> {
    let event = find_event(&state, &event_slug).await?;
    let ctx = context(&state, &session, &event);
    ctx.set_payment_status(query.status).await?;
    tracing::info!("payment status recorded");
    Ok(Redirect::to(&PhaseName::Confirm.url(&event.slug)))
}

#[cfg(test)]
mod tests {
    use convention_core::EventId;

    use super::*;

    fn event() -> Event {
        Event {
            id: EventId::new(1),
            slug: "tracon".to_string(),
            name: "Tracon".to_string(),
            homepage_url: "https://tracon.fi".to_string(),
            ticket_sales_open: true,
        }
    }

    #[test]
    fn test_redirect_urls() {
        let event = event();
        assert_eq!(
            redirect_url(&event, RedirectTarget::Phase(PhaseName::Address)),
            "/events/tracon/tickets/address"
        );
        assert_eq!(
            redirect_url(&event, RedirectTarget::Homepage),
            "https://tracon.fi"
        );
        assert_eq!(
            redirect_url(
                &event,
                RedirectTarget::External("http://localhost:8000/process/?order=3".to_string())
            ),
            "http://localhost:8000/process/?order=3"
        );
    }
}
