//! Application state shared across handlers.

use std::sync::Arc;

use moka::future::Cache;

use convention_core::shop::Event;

use crate::config::TicketsConfig;
use crate::db::{RepositoryError, TicketStore};
use crate::phases::PhaseRegistry;

/// Upper bound on cached events.
const EVENT_CACHE_CAPACITY: u64 = 1_000;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: TicketsConfig,
    store: Arc<dyn TicketStore>,
    phases: PhaseRegistry,
    events: Cache<String, Event>,
}

impl AppState {
    #[must_use]
    pub fn new(config: TicketsConfig, store: Arc<dyn TicketStore>) -> Self {
        let events = Cache::builder()
            .max_capacity(EVENT_CACHE_CAPACITY)
            .time_to_live(config.event_cache_ttl)
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                phases: PhaseRegistry::new(),
                events,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &TicketsConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn TicketStore {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn phases(&self) -> &PhaseRegistry {
        &self.inner.phases
    }

    /// Look up an event by slug.
    ///
    /// Found events are cached for the configured TTL, so opening or closing
    /// ticket sales takes up to that long to show. Misses are not cached.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store lookup fails.
    pub async fn event(&self, slug: &str) -> Result<Option<Event>, RepositoryError> {
        if let Some(event) = self.inner.events.get(slug).await {
            return Ok(Some(event));
        }

        let event = self.inner.store.event_by_slug(slug).await?;
        if let Some(event) = &event {
            self.inner
                .events
                .insert(slug.to_string(), event.clone())
                .await;
        }
        Ok(event)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;
    use url::Url;

    use super::*;
    use crate::config::{DEFAULT_PAYMENT_URL, SentryConfig};
    use crate::db::MemoryTicketStore;

    fn config() -> TicketsConfig {
        TicketsConfig {
            database_url: SecretString::from("postgres://localhost/tickets"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("k".repeat(32)),
            payment_url: Url::parse(DEFAULT_PAYMENT_URL).unwrap(),
            event_cache_ttl: Duration::from_secs(60),
            sentry: SentryConfig {
                dsn: None,
                environment: "development".to_string(),
                sample_rate: 1.0,
                traces_sample_rate: 0.0,
            },
        }
    }

    #[tokio::test]
    async fn test_event_lookup_is_cached() {
        let store = Arc::new(MemoryTicketStore::new());
        let event = store.add_event("tracon", "Tracon", "https://tracon.fi").await;
        let state = AppState::new(config(), store.clone());

        assert_eq!(state.event("tracon").await.unwrap(), Some(event.clone()));

        // served from the cache until the TTL runs out
        store.set_ticket_sales_open(event.id, false).await;
        assert!(state.event("tracon").await.unwrap().unwrap().ticket_sales_open);
    }

    #[tokio::test]
    async fn test_unknown_event_is_not_cached() {
        let store = Arc::new(MemoryTicketStore::new());
        let state = AppState::new(config(), store.clone());

        assert_eq!(state.event("ropecon").await.unwrap(), None);
        store.add_event("ropecon", "Ropecon", "https://ropecon.fi").await;
        assert!(state.event("ropecon").await.unwrap().is_some());
    }
}
