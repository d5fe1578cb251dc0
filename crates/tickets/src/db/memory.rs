//! In-process [`TicketStore`] backed by ordered maps.
//!
//! Used by the test suites and for running the shop without a database.
//! Behaves like the Postgres store: line items are unique per
//! (order, product), deleting an order deletes its line items, and
//! multi-line saves are validated before anything is written.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use convention_core::shop::{
    Customer, CustomerInput, Event, Order, OrderLine, OrderProduct, Product,
};
use convention_core::{CustomerId, EventId, OrderId, OrderProductId, Price, ProductId};

use super::{RepositoryError, TicketStore};

#[derive(Default)]
struct Tables {
    next_id: i32,
    events: BTreeMap<EventId, Event>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    order_products: BTreeMap<OrderProductId, OrderProduct>,
    customers: BTreeMap<CustomerId, Customer>,
}

impl Tables {
    const fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Ticket store kept in `BTreeMap` tables behind a lock.
#[derive(Default)]
pub struct MemoryTicketStore {
    tables: RwLock<Tables>,
}

impl MemoryTicketStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event with ticket sales open.
    pub async fn add_event(&self, slug: &str, name: &str, homepage_url: &str) -> Event {
        let mut tables = self.tables.write().await;
        let event = Event {
            id: EventId::new(tables.next_id()),
            slug: slug.to_string(),
            name: name.to_string(),
            homepage_url: homepage_url.to_string(),
            ticket_sales_open: true,
        };
        tables.events.insert(event.id, event.clone());
        event
    }

    /// Add an available product.
    pub async fn add_product(
        &self,
        event_id: EventId,
        name: &str,
        price: Price,
        stock: Option<u32>,
    ) -> Product {
        let mut tables = self.tables.write().await;
        let product = Product {
            id: ProductId::new(tables.next_id()),
            event_id,
            name: name.to_string(),
            description: String::new(),
            price,
            available: true,
            stock,
        };
        tables.products.insert(product.id, product.clone());
        product
    }

    pub async fn set_product_available(&self, id: ProductId, available: bool) {
        if let Some(product) = self.tables.write().await.products.get_mut(&id) {
            product.available = available;
        }
    }

    pub async fn set_ticket_sales_open(&self, id: EventId, open: bool) {
        if let Some(event) = self.tables.write().await.events.get_mut(&id) {
            event.ticket_sales_open = open;
        }
    }

    /// Number of orders currently stored.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn event_by_slug(&self, slug: &str) -> Result<Option<Event>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.events.values().find(|e| e.slug == slug).cloned())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn create_order(&self, event_id: EventId) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.events.contains_key(&event_id) {
            return Err(RepositoryError::NotFound);
        }
        let id = OrderId::new(tables.next_id());
        let order = Order {
            id: Some(id),
            ..Order::new(event_id)
        };
        tables.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.orders.remove(&id);
        tables.order_products.retain(|_, op| op.order_id != id);
        Ok(())
    }

    async fn confirm_order(&self, id: OrderId) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write().await;
        let order = tables.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if order.confirmed_at.is_none() {
            order.confirmed_at = Some(Utc::now());
        }
        Ok(order.clone())
    }

    async fn set_order_customer(
        &self,
        order_id: OrderId,
        customer_id: CustomerId,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get_mut(&order_id)
            .ok_or(RepositoryError::NotFound)?;
        order.customer_id = Some(customer_id);
        Ok(())
    }

    async fn available_products(&self, event_id: EventId) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .values()
            .filter(|p| p.event_id == event_id && p.available)
            .cloned()
            .collect())
    }

    async fn products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.products.get(id).cloned())
            .collect())
    }

    async fn get_or_create_order_product(
        &self,
        order_id: OrderId,
        product_id: ProductId,
    ) -> Result<OrderProduct, RepositoryError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .order_products
            .values()
            .find(|op| op.order_id == order_id && op.product_id == product_id)
        {
            return Ok(*existing);
        }
        if !tables.orders.contains_key(&order_id) || !tables.products.contains_key(&product_id) {
            return Err(RepositoryError::NotFound);
        }

        let order_product = OrderProduct {
            id: OrderProductId::new(tables.next_id()),
            order_id,
            product_id,
            count: 0,
        };
        tables.order_products.insert(order_product.id, order_product);
        Ok(order_product)
    }

    async fn order_lines(
        &self,
        order_id: OrderId,
        nonzero_only: bool,
    ) -> Result<Vec<OrderLine>, RepositoryError> {
        let tables = self.tables.read().await;
        tables
            .order_products
            .values()
            .filter(|op| op.order_id == order_id && (!nonzero_only || op.count > 0))
            .map(|op| {
                let product = tables.products.get(&op.product_id).cloned().ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "order product {} references missing product {}",
                        op.id, op.product_id
                    ))
                })?;
                Ok(OrderLine {
                    order_product: *op,
                    product,
                })
            })
            .collect()
    }

    async fn save_order_products(
        &self,
        counts: &[(OrderProductId, u32)],
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if counts
            .iter()
            .any(|(id, _)| !tables.order_products.contains_key(id))
        {
            return Err(RepositoryError::NotFound);
        }
        for (id, count) in counts {
            if let Some(op) = tables.order_products.get_mut(id) {
                op.count = *count;
            }
        }
        Ok(())
    }

    async fn customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        Ok(self.tables.read().await.customers.get(&id).cloned())
    }

    async fn save_customer(
        &self,
        existing: Option<CustomerId>,
        input: &CustomerInput,
    ) -> Result<Customer, RepositoryError> {
        let mut tables = self.tables.write().await;
        let id = match existing {
            Some(id) if tables.customers.contains_key(&id) => id,
            Some(_) => return Err(RepositoryError::NotFound),
            None => CustomerId::new(tables.next_id()),
        };
        let customer = input.clone().into_customer(id);
        tables.customers.insert(id, customer.clone());
        Ok(customer)
    }

    async fn sold_counts(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, u32>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut sold = HashMap::new();
        for op in tables.order_products.values() {
            let confirmed = tables
                .orders
                .get(&op.order_id)
                .is_some_and(Order::is_confirmed);
            if confirmed && ids.contains(&op.product_id) {
                *sold.entry(op.product_id).or_insert(0) += op.count;
            }
        }
        Ok(sold)
    }
}
