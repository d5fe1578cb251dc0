//! Ticket purchase wizard.
//!
//! A purchase walks through an ordered list of phases:
//!
//! ```text
//! Welcome -> Tickets -> Address -> Confirm -(payment)-> Thanks -(new order)-> Welcome
//! ```
//!
//! Every phase implements [`Phase`]. Requests are routed through
//! [`dispatch`], which applies the shared rules: allowed methods, the
//! availability gate that stops phase skipping, the `next`/`prev`/`cancel`
//! actions of the form buttons and the payment callback flag.
//!
//! When an event's ticket sales are closed, [`closed::ClosedPhase`] answers
//! on every phase URL instead.

pub mod address;
pub mod closed;
pub mod confirm;
pub mod context;
pub mod forms;
pub mod registry;
pub mod thanks;
pub mod tickets;
pub mod view;
pub mod welcome;

use std::fmt;

use async_trait::async_trait;
use axum::http::Method;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use convention_core::shop::{Order, OrderLine};

use crate::db::RepositoryError;
use crate::error::add_breadcrumb;
use crate::models::PAYMENT_STATUS_SUCCESS;

pub use context::PhaseContext;
pub use forms::{FormData, PhaseForm};
pub use registry::{FIRST_PHASE, LAST_PHASE, PhaseRegistry};
pub use view::PhasePage;

/// Methods every phase answers to.
pub const DEFAULT_METHODS: &[Method] = &[Method::GET, Method::POST];

/// Stable identifier of a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseName {
    Welcome,
    Tickets,
    Address,
    Confirm,
    Thanks,
    /// Replaces the whole flow while ticket sales are closed.
    Closed,
}

impl PhaseName {
    /// Last path segment of the phase URL.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Tickets => "tickets",
            Self::Address => "address",
            Self::Confirm => "confirm",
            Self::Thanks => "thanks",
            Self::Closed => "closed",
        }
    }

    #[must_use]
    pub const fn route_name(self) -> &'static str {
        match self {
            Self::Welcome => "tickets_welcome_view",
            Self::Tickets => "tickets_tickets_view",
            Self::Address => "tickets_address_view",
            Self::Confirm => "tickets_confirm_view",
            Self::Thanks => "tickets_thanks_view",
            Self::Closed => "tickets_closed_view",
        }
    }

    /// Phase for a URL segment. The closed phase has no URL of its own.
    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        [
            Self::Welcome,
            Self::Tickets,
            Self::Address,
            Self::Confirm,
            Self::Thanks,
        ]
        .into_iter()
        .find(|name| name.slug() == slug)
    }

    /// Path of this phase for an event.
    ///
    /// The closed phase is served at the welcome URL.
    #[must_use]
    pub fn url(self, event_slug: &str) -> String {
        let slug = match self {
            Self::Closed => Self::Welcome.slug(),
            other => other.slug(),
        };
        format!("/events/{event_slug}/tickets/{slug}")
    }
}

impl fmt::Display for PhaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Error,
}

impl MessageLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

/// A flash-style message shown above the phase form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub level: MessageLevel,
    pub text: String,
}

impl Message {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            text: text.into(),
        }
    }
}

/// Reasons a submission cannot advance the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationError {
    /// A field failed to parse or a required field is missing.
    Syntax,
    /// No products were selected.
    Zero,
    /// A selected product has sold out.
    Soldout,
    /// A product in the order sold out before confirmation.
    SoldoutConfirm,
}

impl ValidationError {
    /// Marker used by templates to show the matching notice.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::Zero => "zero",
            Self::Soldout => "soldout",
            Self::SoldoutConfirm => "soldout_confirm",
        }
    }
}

/// Outcome of validating a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    pub errors: Vec<ValidationError>,
    pub messages: Vec<Message>,
}

impl Validation {
    #[must_use]
    pub fn valid() -> Self {
        Self::default()
    }

    /// The generic "check the form" failure.
    #[must_use]
    pub fn syntax() -> Self {
        let mut validation = Self::default();
        validation.push(
            ValidationError::Syntax,
            Some(Message::error("Please check the form contents.")),
        );
        validation
    }

    /// Syntax validation of a single bound form.
    #[must_use]
    pub fn of_form(form: &PhaseForm) -> Self {
        if form.is_valid() {
            Self::valid()
        } else {
            Self::syntax()
        }
    }

    pub fn push(&mut self, error: ValidationError, message: Option<Message>) {
        self.errors.push(error);
        self.messages.extend(message);
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn has(&self, error: ValidationError) -> bool {
        self.errors.contains(&error)
    }
}

/// Phase-specific data for the template.
#[derive(Debug, Clone, Default)]
pub struct PhaseVars {
    /// Line items to list, if the phase shows the order contents.
    pub lines: Vec<OrderLine>,
}

/// Where a phase sends the buyer next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    /// Another phase of the same event.
    Phase(PhaseName),
    /// The event's homepage.
    Homepage,
    /// An absolute URL outside the shop, e.g. payment initiation.
    External(String),
}

/// Result of dispatching a request to a phase.
#[derive(Debug)]
pub enum PhaseOutcome {
    Redirect(RedirectTarget),
    Render(Box<PhasePage>),
}

impl PhaseOutcome {
    const fn redirect_to(phase: PhaseName) -> Self {
        Self::Redirect(RedirectTarget::Phase(phase))
    }
}

/// Errors raised while handling a phase request.
#[derive(Debug, thiserror::Error)]
pub enum PhaseError {
    #[error("method {method} not allowed")]
    MethodNotAllowed {
        method: Method,
        allowed: &'static [Method],
    },

    /// The submitted `action` is not one of the form buttons.
    #[error("invalid action: {0:?}")]
    InvalidAction(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// The phase needs a saved order but the session has none.
    #[error("order has not been saved")]
    OrderNotSaved,
}

/// One step of the purchase wizard.
///
/// The provided methods implement the common behaviour; phases override the
/// ones they need.
#[async_trait]
pub trait Phase: Send + Sync {
    fn name(&self) -> PhaseName;

    /// Title shown in the phase list.
    fn friendly_name(&self) -> &'static str;

    fn prev_phase(&self) -> Option<PhaseName>;

    fn next_phase(&self) -> Option<PhaseName>;

    fn methods(&self) -> &'static [Method] {
        DEFAULT_METHODS
    }

    fn next_text(&self) -> &'static str {
        "Next »"
    }

    fn can_cancel(&self) -> bool {
        true
    }

    /// Whether the next button leaves for the payment provider.
    fn payment_phase(&self) -> bool {
        false
    }

    /// A phase is open once its previous phase is done, until the order is
    /// confirmed.
    async fn available(&self, ctx: &PhaseContext<'_>, order: &Order) -> Result<bool, PhaseError> {
        if order.is_confirmed() {
            return Ok(false);
        }
        ctx.is_phase_completed(self.prev_phase()).await
    }

    async fn make_form(
        &self,
        _ctx: &PhaseContext<'_>,
        _order: &Order,
        _data: Option<&FormData>,
    ) -> Result<PhaseForm, PhaseError> {
        Ok(PhaseForm::Null)
    }

    async fn validate(
        &self,
        _ctx: &PhaseContext<'_>,
        _order: &Order,
        form: &PhaseForm,
    ) -> Result<Validation, PhaseError> {
        Ok(Validation::of_form(form))
    }

    async fn save(
        &self,
        _ctx: &PhaseContext<'_>,
        _order: &Order,
        _form: &PhaseForm,
    ) -> Result<(), PhaseError> {
        Ok(())
    }

    async fn next(&self, _ctx: &PhaseContext<'_>) -> Result<RedirectTarget, PhaseError> {
        Ok(self
            .next_phase()
            .map_or(RedirectTarget::Homepage, RedirectTarget::Phase))
    }

    async fn prev(&self, _ctx: &PhaseContext<'_>) -> Result<RedirectTarget, PhaseError> {
        Ok(RedirectTarget::Phase(
            self.prev_phase().unwrap_or(FIRST_PHASE),
        ))
    }

    /// Throw the order away and leave the shop.
    async fn cancel(&self, ctx: &PhaseContext<'_>) -> Result<RedirectTarget, PhaseError> {
        ctx.destroy_order().await?;
        Ok(RedirectTarget::Homepage)
    }

    async fn vars(&self, _ctx: &PhaseContext<'_>, _order: &Order) -> Result<PhaseVars, PhaseError> {
        Ok(PhaseVars::default())
    }
}

/// Handle one request to `phase`.
///
/// `data` is the submitted form for POST requests.
///
/// # Errors
///
/// Returns `PhaseError::MethodNotAllowed` for methods the phase does not
/// accept and `PhaseError::InvalidAction` for an unknown POST `action`. Any
/// storage or session failure is passed through.
#[instrument(
    skip_all,
    fields(
        event = %ctx.event.slug,
        phase = %phase.name(),
        method = %method,
        order_id = tracing::field::Empty,
        action = tracing::field::Empty,
    )
)]
pub async fn dispatch(
    phase: &dyn Phase,
    ctx: &PhaseContext<'_>,
    method: &Method,
    data: Option<&FormData>,
) -> Result<PhaseOutcome, PhaseError> {
    if !phase.methods().contains(method) {
        return Err(PhaseError::MethodNotAllowed {
            method: method.clone(),
            allowed: phase.methods(),
        });
    }

    let order = ctx.order().await?;
    if let Some(id) = order.id {
        tracing::Span::current().record("order_id", id.as_i32());
    }

    if !phase.available(ctx, &order).await? {
        let target = unavailable_target(phase, ctx, &order).await?;
        tracing::debug!(%target, "phase not available");
        return Ok(PhaseOutcome::redirect_to(target));
    }

    let data = data.filter(|_| *method == Method::POST);
    let form = phase.make_form(ctx, &order, data).await?;

    if *method == Method::POST {
        let action = data.and_then(|d| d.get("action")).unwrap_or("cancel");
        tracing::Span::current().record("action", action);

        match action {
            // No validation on cancel or prev.
            "cancel" => {
                add_breadcrumb("checkout", "Cancelled order", Some(&[("phase", phase.name().slug())]));
                return Ok(PhaseOutcome::Redirect(phase.cancel(ctx).await?));
            }
            "prev" => return Ok(PhaseOutcome::Redirect(phase.prev(ctx).await?)),
            "next" => {}
            other => return Err(PhaseError::InvalidAction(other.to_string())),
        }

        let validation = phase.validate(ctx, &order, &form).await?;
        if validation.is_valid() {
            phase.save(ctx, &order, &form).await?;
            ctx.complete_phase(phase.name()).await?;
            add_breadcrumb("checkout", "Completed phase", Some(&[("phase", phase.name().slug())]));
            tracing::info!("phase completed");
            return Ok(PhaseOutcome::Redirect(phase.next(ctx).await?));
        }

        tracing::debug!(errors = ?validation.errors, "submission rejected");
        return render(phase, ctx, &order, &form, validation).await;
    }

    if ctx.take_payment_status(PAYMENT_STATUS_SUCCESS).await? {
        if order.is_confirmed() {
            return Ok(PhaseOutcome::redirect_to(PhaseName::Confirm));
        }
        if let Some(id) = order.id {
            ctx.store.confirm_order(id).await?;
            ctx.complete_phase(phase.name()).await?;
            add_breadcrumb("checkout", "Payment confirmed", Some(&[("phase", phase.name().slug())]));
            tracing::info!("order confirmed after payment");
            return Ok(PhaseOutcome::Redirect(phase.next(ctx).await?));
        }
        tracing::warn!("payment callback without a saved order");
    }

    render(phase, ctx, &order, &form, Validation::valid()).await
}

/// Where a request for an unavailable `phase` is sent.
///
/// Open orders restart at [`FIRST_PHASE`]. Confirmed orders that skipped a
/// step go to [`LAST_PHASE`]; every other confirmed order lands on Thanks,
/// which is always open to confirmed orders.
async fn unavailable_target(
    phase: &dyn Phase,
    ctx: &PhaseContext<'_>,
    order: &Order,
) -> Result<PhaseName, PhaseError> {
    if !order.is_confirmed() {
        return Ok(FIRST_PHASE);
    }
    if phase.name() != LAST_PHASE && !ctx.is_phase_completed(phase.prev_phase()).await? {
        return Ok(LAST_PHASE);
    }
    Ok(PhaseName::Thanks)
}

async fn render(
    phase: &dyn Phase,
    ctx: &PhaseContext<'_>,
    order: &Order,
    form: &PhaseForm,
    validation: Validation,
) -> Result<PhaseOutcome, PhaseError> {
    let vars = phase.vars(ctx, order).await?;
    let page = PhasePage::build(phase, ctx, order, form, validation, vars).await?;
    Ok(PhaseOutcome::Render(Box::new(page)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_round_trip() {
        for name in [
            PhaseName::Welcome,
            PhaseName::Tickets,
            PhaseName::Address,
            PhaseName::Confirm,
            PhaseName::Thanks,
        ] {
            assert_eq!(PhaseName::from_slug(name.slug()), Some(name));
        }
        assert_eq!(PhaseName::from_slug("closed"), None);
    }

    #[test]
    fn test_closed_is_served_at_welcome_url() {
        assert_eq!(
            PhaseName::Closed.url("tracon"),
            "/events/tracon/tickets/welcome"
        );
        assert_eq!(
            PhaseName::Confirm.url("tracon"),
            "/events/tracon/tickets/confirm"
        );
    }

    #[test]
    fn test_route_names_are_stable() {
        assert_eq!(PhaseName::Address.route_name(), "tickets_address_view");
        assert_eq!(PhaseName::Thanks.route_name(), "tickets_thanks_view");
    }

    #[test]
    fn test_validation_collects_markers_and_messages() {
        let mut validation = Validation::valid();
        assert!(validation.is_valid());

        validation.push(ValidationError::Zero, Some(Message::info("pick one")));
        validation.push(ValidationError::SoldoutConfirm, None);
        assert!(!validation.is_valid());
        assert!(validation.has(ValidationError::Zero));
        assert_eq!(validation.messages.len(), 1);
        assert_eq!(ValidationError::SoldoutConfirm.marker(), "soldout_confirm");
    }
}
