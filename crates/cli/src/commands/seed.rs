//! Seed an event and its products.

use std::str::FromStr;

use convention_core::Price;
use convention_tickets::db::{self, PgTicketStore};

use super::{CommandError, database_url};

/// A product given on the command line as `NAME:CENTS[:STOCK]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSpec {
    pub name: String,
    pub price_cents: i64,
    pub stock: Option<u32>,
}

impl FromStr for ProductSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let name = parts
            .next()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| format!("missing product name in {s:?}"))?;
        let price_cents = parts
            .next()
            .ok_or_else(|| format!("missing price in {s:?}"))?
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("invalid price in {s:?}: {e}"))?;
        if price_cents < 0 {
            return Err(format!("negative price in {s:?}"));
        }
        let stock = parts
            .next()
            .map(|stock| stock.trim().parse::<u32>())
            .transpose()
            .map_err(|e| format!("invalid stock in {s:?}: {e}"))?;
        if parts.next().is_some() {
            return Err(format!("too many fields in {s:?}"));
        }

        Ok(Self {
            name: name.to_string(),
            price_cents,
            stock,
        })
    }
}

/// Create or update an event and add the given products.
///
/// Ticket sales of a new event start out open.
///
/// # Errors
///
/// Returns an error if the database URL is missing or a query fails.
pub async fn event(
    slug: &str,
    name: &str,
    homepage_url: &str,
    products: &[ProductSpec],
) -> Result<(), CommandError> {
    let database_url = database_url()?;
    let store = PgTicketStore::new(db::create_pool(&database_url).await?);

    let event = store.upsert_event(slug, name, homepage_url).await?;
    tracing::info!(event_id = %event.id, slug, "event ready");

    for spec in products {
        let product = store
            .create_product(
                event.id,
                &spec.name,
                Price::from_cents(spec.price_cents),
                spec.stock,
            )
            .await?;
        tracing::info!(product_id = %product.id, name = %product.name, "product created");
    }
    Ok(())
}
