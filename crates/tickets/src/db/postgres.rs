//! `PostgreSQL` implementation of [`TicketStore`].
//!
//! Queries are checked at runtime and mapped through `FromRow` row types so
//! the crate builds without a live database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use convention_core::shop::{
    Customer, CustomerInput, Event, Order, OrderLine, OrderProduct, Product,
};
use convention_core::{
    CustomerId, Email, EventId, OrderId, OrderProductId, PhoneNumber, PostalCode, Price, ProductId,
};

use super::{RepositoryError, TicketStore};

#[derive(sqlx::FromRow)]
struct EventRow {
    id: i32,
    slug: String,
    name: String,
    homepage_url: String,
    ticket_sales_open: bool,
}

impl From<EventRow> for Event {
    fn from(r: EventRow) -> Self {
        Self {
            id: EventId::new(r.id),
            slug: r.slug,
            name: r.name,
            homepage_url: r.homepage_url,
            ticket_sales_open: r.ticket_sales_open,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    event_id: i32,
    name: String,
    description: String,
    price_cents: i64,
    available: bool,
    stock: Option<i32>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(r: ProductRow) -> Result<Self, Self::Error> {
        let stock = r
            .stock
            .map(|s| {
                u32::try_from(s).map_err(|_| {
                    RepositoryError::DataCorruption(format!("negative stock on product {}", r.id))
                })
            })
            .transpose()?;

        Ok(Self {
            id: ProductId::new(r.id),
            event_id: EventId::new(r.event_id),
            name: r.name,
            description: r.description,
            price: Price::from_cents(r.price_cents),
            available: r.available,
            stock,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    event_id: i32,
    customer_id: Option<i32>,
    confirmed_at: Option<DateTime<Utc>>,
}

impl From<OrderRow> for Order {
    fn from(r: OrderRow) -> Self {
        Self {
            id: Some(OrderId::new(r.id)),
            event_id: EventId::new(r.event_id),
            customer_id: r.customer_id.map(CustomerId::new),
            confirmed_at: r.confirmed_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderProductRow {
    id: i32,
    order_id: i32,
    product_id: i32,
    count: i32,
}

impl TryFrom<OrderProductRow> for OrderProduct {
    type Error = RepositoryError;

    fn try_from(r: OrderProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderProductId::new(r.id),
            order_id: OrderId::new(r.order_id),
            product_id: ProductId::new(r.product_id),
            count: count_from_db(r.count, r.id)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    op_id: i32,
    order_id: i32,
    count: i32,
    #[sqlx(flatten)]
    product: ProductRow,
}

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: i32,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    address: String,
    postal_code: String,
    city: String,
    allow_marketing_email: bool,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = RepositoryError;

    fn try_from(r: CustomerRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let phone = r
            .phone
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(PhoneNumber::parse)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid phone in database: {e}")))?;
        let postal_code = PostalCode::parse(&r.postal_code).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid postal code in database: {e}"))
        })?;

        Ok(Self {
            id: CustomerId::new(r.id),
            first_name: r.first_name,
            last_name: r.last_name,
            email,
            phone,
            address: r.address,
            postal_code,
            city: r.city,
            allow_marketing_email: r.allow_marketing_email,
        })
    }
}

fn count_from_db(count: i32, id: i32) -> Result<u32, RepositoryError> {
    u32::try_from(count)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative count on order product {id}")))
}

fn count_to_db(count: u32) -> Result<i32, RepositoryError> {
    i32::try_from(count).map_err(|_| RepositoryError::Conflict(format!("count {count} is too large")))
}

const PRODUCT_COLUMNS: &str =
    "id, event_id, name, description, price_cents, available, stock";

const CUSTOMER_COLUMNS: &str = "id, first_name, last_name, email, phone, address, postal_code, \
                                city, allow_marketing_email";

/// Ticket store backed by the `tickets` schema.
#[derive(Clone)]
pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert an event, or update its name and homepage if the slug exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_event(
        &self,
        slug: &str,
        name: &str,
        homepage_url: &str,
    ) -> Result<Event, RepositoryError> {
        let row = sqlx::query_as::<_, EventRow>(
            r"
            INSERT INTO tickets.event (slug, name, homepage_url)
            VALUES ($1, $2, $3)
            ON CONFLICT (slug) DO UPDATE
                SET name = EXCLUDED.name, homepage_url = EXCLUDED.homepage_url
            RETURNING id, slug, name, homepage_url, ticket_sales_open
            ",
        )
        .bind(slug)
        .bind(name)
        .bind(homepage_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    /// Add a product to an event's catalogue.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the stock does not fit the column.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create_product(
        &self,
        event_id: EventId,
        name: &str,
        price: Price,
        stock: Option<u32>,
    ) -> Result<Product, RepositoryError> {
        let stock = stock.map(count_to_db).transpose()?;
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO tickets.product (event_id, name, price_cents, stock)
            VALUES ($1, $2, $3, $4)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(event_id)
        .bind(name)
        .bind(price.cents())
        .bind(stock)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn event_by_slug(&self, slug: &str) -> Result<Option<Event>, RepositoryError> {
        let row = sqlx::query_as::<_, EventRow>(
            r"
            SELECT id, slug, name, homepage_url, ticket_sales_open
            FROM tickets.event
            WHERE slug = $1
            ",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Event::from))
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, event_id, customer_id, confirmed_at
            FROM tickets."order"
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Order::from))
    }

    async fn create_order(&self, event_id: EventId) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            INSERT INTO tickets."order" (event_id)
            VALUES ($1)
            RETURNING id, event_id, customer_id, confirmed_at
            "#,
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                RepositoryError::NotFound
            }
            other => RepositoryError::Database(other),
        })?;

        Ok(row.into())
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), RepositoryError> {
        // order_product rows go with it (ON DELETE CASCADE)
        sqlx::query(r#"DELETE FROM tickets."order" WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn confirm_order(&self, id: OrderId) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            UPDATE tickets."order"
            SET confirmed_at = COALESCE(confirmed_at, NOW())
            WHERE id = $1
            RETURNING id, event_id, customer_id, confirmed_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::from).ok_or(RepositoryError::NotFound)
    }

    async fn set_order_customer(
        &self,
        order_id: OrderId,
        customer_id: CustomerId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(r#"UPDATE tickets."order" SET customer_id = $2 WHERE id = $1"#)
            .bind(order_id)
            .bind(customer_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn available_products(&self, event_id: EventId) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM tickets.product
            WHERE event_id = $1 AND available
            ORDER BY ordering, id
            "
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM tickets.product
            WHERE id = ANY($1)
            ORDER BY ordering, id
            "
        ))
        .bind(raw)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn get_or_create_order_product(
        &self,
        order_id: OrderId,
        product_id: ProductId,
    ) -> Result<OrderProduct, RepositoryError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query_as::<_, OrderProductRow>(
            r"
            INSERT INTO tickets.order_product (order_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT (order_id, product_id) DO UPDATE SET count = order_product.count
            RETURNING id, order_id, product_id, count
            ",
        )
        .bind(order_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                RepositoryError::NotFound
            }
            other => RepositoryError::Database(other),
        })?;

        row.try_into()
    }

    async fn order_lines(
        &self,
        order_id: OrderId,
        nonzero_only: bool,
    ) -> Result<Vec<OrderLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderLineRow>(
            r"
            SELECT op.id AS op_id, op.order_id, op.count,
                   p.id, p.event_id, p.name, p.description, p.price_cents,
                   p.available, p.stock
            FROM tickets.order_product op
            JOIN tickets.product p ON p.id = op.product_id
            WHERE op.order_id = $1 AND (NOT $2 OR op.count > 0)
            ORDER BY p.ordering, p.id
            ",
        )
        .bind(order_id)
        .bind(nonzero_only)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                let product = Product::try_from(r.product)?;
                Ok(OrderLine {
                    order_product: OrderProduct {
                        id: OrderProductId::new(r.op_id),
                        order_id: OrderId::new(r.order_id),
                        product_id: product.id,
                        count: count_from_db(r.count, r.op_id)?,
                    },
                    product,
                })
            })
            .collect()
    }

    async fn save_order_products(
        &self,
        counts: &[(OrderProductId, u32)],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for (id, count) in counts {
            let result = sqlx::query("UPDATE tickets.order_product SET count = $2 WHERE id = $1")
                .bind(*id)
                .bind(count_to_db(*count)?)
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() == 0 {
                // dropping tx rolls back the rows already written
                return Err(RepositoryError::NotFound);
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM tickets.customer WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Customer::try_from).transpose()
    }

    async fn save_customer(
        &self,
        existing: Option<CustomerId>,
        input: &CustomerInput,
    ) -> Result<Customer, RepositoryError> {
        let phone = input.phone.as_ref().map(PhoneNumber::as_str);

        let row = if let Some(id) = existing {
            sqlx::query_as::<_, CustomerRow>(&format!(
                r"
                UPDATE tickets.customer
                SET first_name = $2, last_name = $3, email = $4, phone = $5,
                    address = $6, postal_code = $7, city = $8,
                    allow_marketing_email = $9, updated_at = NOW()
                WHERE id = $1
                RETURNING {CUSTOMER_COLUMNS}
                "
            ))
            .bind(id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(input.email.as_str())
            .bind(phone)
            .bind(&input.address)
            .bind(input.postal_code.as_str())
            .bind(&input.city)
            .bind(input.allow_marketing_email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?
        } else {
            sqlx::query_as::<_, CustomerRow>(&format!(
                r"
                INSERT INTO tickets.customer
                    (first_name, last_name, email, phone, address, postal_code, city,
                     allow_marketing_email)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {CUSTOMER_COLUMNS}
                "
            ))
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(input.email.as_str())
            .bind(phone)
            .bind(&input.address)
            .bind(input.postal_code.as_str())
            .bind(&input.city)
            .bind(input.allow_marketing_email)
            .fetch_one(&self.pool)
            .await?
        };

        row.try_into()
    }

    async fn sold_counts(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, u32>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows: Vec<(i32, i64)> = sqlx::query_as(
            r#"
            SELECT op.product_id, COALESCE(SUM(op.count), 0)::BIGINT
            FROM tickets.order_product op
            JOIN tickets."order" o ON o.id = op.order_id
            WHERE o.confirmed_at IS NOT NULL AND op.product_id = ANY($1)
            GROUP BY op.product_id
            "#,
        )
        .bind(raw)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, sold)| {
                let sold = u32::try_from(sold).map_err(|_| {
                    RepositoryError::DataCorruption(format!("sold count out of range for {id}"))
                })?;
                Ok((ProductId::new(id), sold))
            })
            .collect()
    }
}
