//! Template data for phase pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::{IntoResponse, Response};

use convention_core::shop::{self, Customer, Event, Order, OrderLine};

use super::forms::FieldView;
use super::{Message, Phase, PhaseContext, PhaseError, PhaseForm, PhaseName, PhaseVars, Validation};

/// Event details for the page header.
#[derive(Debug, Clone)]
pub struct EventView {
    pub name: String,
    pub slug: String,
    pub homepage_url: String,
}

impl From<&Event> for EventView {
    fn from(event: &Event) -> Self {
        Self {
            name: event.name.clone(),
            slug: event.slug.clone(),
            homepage_url: event.homepage_url.clone(),
        }
    }
}

/// Entry in the phase list.
#[derive(Debug, Clone)]
pub struct PhaseLink {
    pub url: String,
    pub friendly_name: &'static str,
    /// Earlier phases link back while the order is still open.
    pub available: bool,
    pub current: bool,
}

/// The phase being rendered and its buttons.
#[derive(Debug, Clone)]
pub struct PhaseMeta {
    pub name: PhaseName,
    pub url: String,
    pub friendly_name: &'static str,
    pub has_next: bool,
    pub has_prev: bool,
    pub can_cancel: bool,
    pub next_text: &'static str,
    pub payment_phase: bool,
}

#[derive(Debug, Clone)]
pub struct CustomerView {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub postal_code: String,
    pub city: String,
}

impl From<Customer> for CustomerView {
    fn from(customer: Customer) -> Self {
        Self {
            name: customer.full_name(),
            email: customer.email.to_string(),
            phone: customer
                .phone
                .map(|phone| phone.to_string())
                .unwrap_or_default(),
            address: customer.address,
            postal_code: customer.postal_code.to_string(),
            city: customer.city,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: Option<i32>,
    pub confirmed: bool,
    /// Formatted sum of the line totals.
    pub total: String,
    pub customer: Option<CustomerView>,
}

#[derive(Debug, Clone)]
pub struct LineView {
    pub name: String,
    pub count: u32,
    pub unit_price: String,
    pub total: String,
}

impl From<&OrderLine> for LineView {
    fn from(line: &OrderLine) -> Self {
        Self {
            name: line.product.name.clone(),
            count: line.order_product.count,
            unit_price: line.product.price.to_string(),
            total: line.total().to_string(),
        }
    }
}

/// Everything a phase template can show.
#[derive(Debug, Clone)]
pub struct PhasePage {
    pub event: EventView,
    pub phases: Vec<PhaseLink>,
    pub phase: PhaseMeta,
    pub order: OrderView,
    /// Validation markers, e.g. `soldout`.
    pub errors: Vec<&'static str>,
    pub messages: Vec<Message>,
    pub fields: Vec<FieldView>,
    pub lines: Vec<LineView>,
}

impl PhasePage {
    /// Assemble the page for `phase`.
    ///
    /// # Errors
    ///
    /// Returns `PhaseError::Repository` if the order lines or customer
    /// cannot be loaded.
    pub async fn build(
        phase: &dyn Phase,
        ctx: &PhaseContext<'_>,
        order: &Order,
        form: &PhaseForm,
        validation: Validation,
        vars: PhaseVars,
    ) -> Result<Self, PhaseError> {
        let current = ctx.phases.index_of(phase.name());
        let phases = ctx
            .phases
            .phases()
            .enumerate()
            .map(|(index, other)| PhaseLink {
                url: other.name().url(&ctx.event.slug),
                friendly_name: other.friendly_name(),
                available: index < current && !order.is_confirmed(),
                current: other.name() == phase.name(),
            })
            .collect();

        let total = match order.id {
            Some(id) => shop::order_total(&ctx.store.order_lines(id, true).await?),
            None => convention_core::Price::zero(),
        };
        let customer = match order.customer_id {
            Some(id) => ctx.store.customer(id).await?.map(CustomerView::from),
            None => None,
        };

        Ok(Self {
            event: EventView::from(ctx.event),
            phases,
            phase: PhaseMeta {
                name: phase.name(),
                url: phase.name().url(&ctx.event.slug),
                friendly_name: phase.friendly_name(),
                has_next: phase.next_phase().is_some(),
                has_prev: phase.prev_phase().is_some(),
                can_cancel: phase.can_cancel(),
                next_text: phase.next_text(),
                payment_phase: phase.payment_phase(),
            },
            order: OrderView {
                id: order.id.map(|id| id.as_i32()),
                confirmed: order.is_confirmed(),
                total: total.to_string(),
                customer,
            },
            errors: validation.errors.iter().map(|e| e.marker()).collect(),
            messages: validation.messages,
            fields: form.fields(),
            lines: vars.lines.iter().map(LineView::from).collect(),
        })
    }

    #[must_use]
    pub fn has_error(&self, marker: &str) -> bool {
        self.errors.iter().any(|error| *error == marker)
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "tickets/welcome.html")]
pub struct WelcomeTemplate {
    pub page: PhasePage,
}

#[derive(Template, WebTemplate)]
#[template(path = "tickets/tickets.html")]
pub struct TicketsTemplate {
    pub page: PhasePage,
}

#[derive(Template, WebTemplate)]
#[template(path = "tickets/address.html")]
pub struct AddressTemplate {
    pub page: PhasePage,
}

#[derive(Template, WebTemplate)]
#[template(path = "tickets/confirm.html")]
pub struct ConfirmTemplate {
    pub page: PhasePage,
}

#[derive(Template, WebTemplate)]
#[template(path = "tickets/thanks.html")]
pub struct ThanksTemplate {
    pub page: PhasePage,
}

#[derive(Template, WebTemplate)]
#[template(path = "tickets/closed.html")]
pub struct ClosedTemplate {
    pub page: PhasePage,
}

impl IntoResponse for PhasePage {
    fn into_response(self) -> Response {
        match self.phase.name {
            PhaseName::Welcome => WelcomeTemplate { page: self }.into_response(),
            PhaseName::Tickets => TicketsTemplate { page: self }.into_response(),
            PhaseName::Address => AddressTemplate { page: self }.into_response(),
            PhaseName::Confirm => ConfirmTemplate { page: self }.into_response(),
            PhaseName::Thanks => ThanksTemplate { page: self }.into_response(),
            PhaseName::Closed => ClosedTemplate { page: self }.into_response(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::phases::MessageLevel;

    fn page(name: PhaseName) -> PhasePage {
        PhasePage {
            event: EventView {
                name: "Tracon".to_string(),
                slug: "tracon".to_string(),
                homepage_url: "https://tracon.fi".to_string(),
            },
            phases: vec![PhaseLink {
                url: PhaseName::Welcome.url("tracon"),
                friendly_name: "Welcome",
                available: false,
                current: true,
            }],
            phase: PhaseMeta {
                name,
                url: name.url("tracon"),
                friendly_name: "Welcome",
                has_next: true,
                has_prev: false,
                can_cancel: true,
                next_text: "Next »",
                payment_phase: false,
            },
            order: OrderView {
                id: None,
                confirmed: false,
                total: "0.00 €".to_string(),
                customer: None,
            },
            errors: vec!["soldout"],
            messages: vec![Message {
                level: MessageLevel::Error,
                text: "Sold out".to_string(),
            }],
            fields: Vec::new(),
            lines: Vec::new(),
        }
    }

    #[test]
    fn test_has_error_matches_markers() {
        let page = page(PhaseName::Tickets);
        assert!(page.has_error("soldout"));
        assert!(!page.has_error("zero"));
    }

    #[test]
    fn test_templates_render() {
        let welcome = WelcomeTemplate {
            page: page(PhaseName::Welcome),
        }
        .render()
        .unwrap();
        assert!(welcome.contains("Tracon"));
        assert!(welcome.contains("Sold out"));
        assert!(welcome.contains(r#"name="action" value="next""#));

        let closed = ClosedTemplate {
            page: page(PhaseName::Closed),
        }
        .render()
        .unwrap();
        assert!(closed.contains("https://tracon.fi"));
    }
}
