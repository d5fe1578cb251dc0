//! Persistence for the ticket shop.
//!
//! The purchase wizard never talks to a database directly. It goes through
//! [`TicketStore`], which has two implementations:
//!
//! - [`PgTicketStore`] - `PostgreSQL` (schema `tickets`)
//! - [`MemoryTicketStore`] - in-process, for tests and local demos
//!
//! # Tables
//!
//! - `tickets.event` - Events and whether their ticket sales are open
//! - `tickets.product` - Products with price, availability and stock limit
//! - `tickets.customer` - Delivery details entered in the address phase
//! - `tickets.order` - Orders, confirmed once payment succeeds
//! - `tickets.order_product` - Line items, unique per (order, product)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/tickets/migrations/` and run via:
//! ```bash
//! cargo run -p convention-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use convention_core::shop::{
    self, Customer, CustomerInput, Event, Order, OrderLine, OrderProduct, Product,
};
use convention_core::{CustomerId, EventId, OrderId, OrderProductId, ProductId};

pub use memory::MemoryTicketStore;
pub use postgres::PgTicketStore;

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate event slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Order, catalogue and customer storage used by the purchase phases.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Check that the backing storage is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    async fn event_by_slug(&self, slug: &str) -> Result<Option<Event>, RepositoryError>;

    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Persist a new, unconfirmed order.
    async fn create_order(&self, event_id: EventId) -> Result<Order, RepositoryError>;

    /// Delete an order and its line items.
    async fn delete_order(&self, id: OrderId) -> Result<(), RepositoryError>;

    /// Mark an order confirmed. Confirming twice keeps the first timestamp.
    async fn confirm_order(&self, id: OrderId) -> Result<Order, RepositoryError>;

    async fn set_order_customer(
        &self,
        order_id: OrderId,
        customer_id: CustomerId,
    ) -> Result<(), RepositoryError>;

    /// Products of an event that are currently on sale, in display order.
    async fn available_products(&self, event_id: EventId) -> Result<Vec<Product>, RepositoryError>;

    /// Products by ID regardless of availability. Unknown IDs are skipped.
    async fn products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Fetch the line item for (order, product), creating it with count 0.
    async fn get_or_create_order_product(
        &self,
        order_id: OrderId,
        product_id: ProductId,
    ) -> Result<OrderProduct, RepositoryError>;

    /// Line items of an order joined with their products.
    async fn order_lines(
        &self,
        order_id: OrderId,
        nonzero_only: bool,
    ) -> Result<Vec<OrderLine>, RepositoryError>;

    /// Update line item counts as one unit: either all are written or none.
    async fn save_order_products(
        &self,
        counts: &[(OrderProductId, u32)],
    ) -> Result<(), RepositoryError>;

    async fn customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError>;

    /// Insert a customer, or update it in place when `existing` is given.
    async fn save_customer(
        &self,
        existing: Option<CustomerId>,
        input: &CustomerInput,
    ) -> Result<Customer, RepositoryError>;

    /// Units sold in confirmed orders, per product.
    async fn sold_counts(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, u32>, RepositoryError>;

    /// Whether the requested counts exceed what is left on sale.
    ///
    /// This is a read-only check; nothing is reserved.
    async fn is_soldout(&self, requested: &HashMap<ProductId, u32>) -> Result<bool, RepositoryError> {
        let ids: Vec<ProductId> = requested
            .iter()
            .filter(|&(_, &count)| count > 0)
            .map(|(id, _)| *id)
            .collect();
        if ids.is_empty() {
            return Ok(false);
        }

        let products = self.products(&ids).await?;
        let sold = self.sold_counts(&ids).await?;
        Ok(shop::is_soldout(requested, &products, &sold))
    }
}
