//! HTTP route handlers for the ticket shop.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                     - Liveness check
//! GET  /health/ready                               - Readiness check (store reachable)
//!
//! # Purchase wizard (GET renders, POST submits with action=next|prev|cancel)
//! ANY  /events/{event}/tickets/welcome             - Entry, creates the order
//! ANY  /events/{event}/tickets/tickets             - Product counts
//! ANY  /events/{event}/tickets/address             - Delivery details
//! ANY  /events/{event}/tickets/confirm             - Review, leaves for payment
//! ANY  /events/{event}/tickets/thanks              - Receipt
//!
//! # Payment
//! GET  /events/{event}/tickets/payment/return      - Provider callback, ?status=N
//! ```
//!
//! While an event's ticket sales are closed, every wizard URL shows the
//! closed notice.

pub mod health;
pub mod tickets;

use axum::{
    Router,
    routing::{any, get},
};

use crate::state::AppState;

/// Create the wizard routes router, nested under `/events/{event}/tickets`.
pub fn ticket_routes() -> Router<AppState> {
    Router::new()
        .route("/payment/return", get(tickets::payment_return))
        .route("/{phase}", any(tickets::phase))
}

/// Create all routes for the ticket shop.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/events/{event}/tickets", ticket_routes())
}
