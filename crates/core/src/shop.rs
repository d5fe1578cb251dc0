//! Ticket shop entities.
//!
//! An [`Order`] collects [`OrderProduct`] line items for the [`Product`]s
//! of one [`Event`]. Orders start out unsaved, are persisted when the buyer
//! enters the shop and are confirmed once payment succeeds.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    CustomerId, Email, EventId, OrderId, OrderProductId, PhoneNumber, PostalCode, Price, ProductId,
};

/// An event that sells tickets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    /// URL slug, e.g. `tracon2017`.
    pub slug: String,
    pub name: String,
    /// Where buyers are sent after cancelling or when sales are closed.
    pub homepage_url: String,
    /// When false the whole purchase flow is replaced by a closed notice.
    pub ticket_sales_open: bool,
}

/// A product in the event's catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub event_id: EventId,
    pub name: String,
    pub description: String,
    pub price: Price,
    /// Unavailable products are hidden from the shop and cannot be bought.
    pub available: bool,
    /// Maximum number of units that may be sold, `None` for unlimited.
    pub stock: Option<u32>,
}

impl Product {
    /// Whether selling `requested` more units would oversell this product.
    #[must_use]
    pub fn would_oversell(&self, sold: u32, requested: u32) -> bool {
        if requested == 0 {
            return false;
        }
        if !self.available {
            return true;
        }
        self.stock
            .is_some_and(|stock| sold.saturating_add(requested) > stock)
    }
}

/// A requested quantity of one product within an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderProduct {
    pub id: OrderProductId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub count: u32,
}

/// A line item joined with its product, for display and totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub order_product: OrderProduct,
    pub product: Product,
}

impl OrderLine {
    #[must_use]
    pub fn total(&self) -> Price {
        self.product.price.times(self.order_product.count)
    }
}

/// Sum of all line totals. Zero-count lines contribute nothing.
#[must_use]
pub fn order_total(lines: &[OrderLine]) -> Price {
    lines.iter().map(OrderLine::total).sum()
}

/// A purchase, in progress or confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// `None` until the order has been saved for the first time.
    pub id: Option<OrderId>,
    pub event_id: EventId,
    pub customer_id: Option<CustomerId>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// A fresh, unsaved order for an event.
    #[must_use]
    pub const fn new(event_id: EventId) -> Self {
        Self {
            id: None,
            event_id,
            customer_id: None,
            confirmed_at: None,
        }
    }

    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }
}

/// A buyer's delivery details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: Option<PhoneNumber>,
    pub address: String,
    pub postal_code: PostalCode,
    pub city: String,
    pub allow_marketing_email: bool,
}

impl Customer {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Validated customer details that have not been saved yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerInput {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: Option<PhoneNumber>,
    pub address: String,
    pub postal_code: PostalCode,
    pub city: String,
    pub allow_marketing_email: bool,
}

impl CustomerInput {
    /// Attach an ID once the row exists.
    #[must_use]
    pub fn into_customer(self, id: CustomerId) -> Customer {
        Customer {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            postal_code: self.postal_code,
            city: self.city,
            allow_marketing_email: self.allow_marketing_email,
        }
    }
}

/// Stock predicate over a `{product -> requested count}` map.
///
/// `sold` holds the units already sold in confirmed orders. A request is
/// sold out when any product with a positive count is unknown, unavailable,
/// or would exceed its stock.
#[must_use]
pub fn is_soldout(
    requested: &HashMap<ProductId, u32>,
    products: &[Product],
    sold: &HashMap<ProductId, u32>,
) -> bool {
    requested
        .iter()
        .filter(|&(_, &count)| count > 0)
        .any(|(product_id, &count)| {
            products
                .iter()
                .find(|p| p.id == *product_id)
                .is_none_or(|product| {
                    let already_sold = sold.get(product_id).copied().unwrap_or(0);
                    product.would_oversell(already_sold, count)
                })
        })
}
