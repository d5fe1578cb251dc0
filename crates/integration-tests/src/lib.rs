//! End-to-end tests for the convention ticket shop.
//!
//! Tests drive the real router in-process: in-memory ticket store, in-memory
//! session store, and a [`TestClient`] that carries the session cookie from
//! one request to the next like a browser would.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p convention-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use secrecy::SecretString;
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use url::Url;

use convention_core::Price;
use convention_core::shop::{Event, Product};
use convention_tickets::config::{DEFAULT_PAYMENT_URL, SentryConfig, TicketsConfig};
use convention_tickets::db::MemoryTicketStore;
use convention_tickets::state::AppState;

/// Slug of the seeded event.
pub const EVENT: &str = "tracon";

/// Homepage of the seeded event.
pub const HOMEPAGE: &str = "https://tracon.fi";

fn config() -> TicketsConfig {
    TicketsConfig {
        database_url: SecretString::from("postgres://localhost/unused"),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from("k9#Lm2$Vq7!Rt4&Wz8*Hc1^Nd6@Pb3%J"),
        payment_url: Url::parse(DEFAULT_PAYMENT_URL).unwrap(),
        event_cache_ttl: Duration::from_secs(60),
        sentry: SentryConfig {
            dsn: None,
            environment: "test".to_string(),
            sample_rate: 0.0,
            traces_sample_rate: 0.0,
        },
    }
}

/// A shop with one event selling two products.
pub struct TestShop {
    pub store: Arc<MemoryTicketStore>,
    pub event: Event,
    /// Weekend ticket (stock 2) and Saturday ticket (unlimited).
    pub products: Vec<Product>,
    router: Router,
}

impl TestShop {
    pub async fn new() -> Self {
        Self::with_sales_open(true).await
    }

    /// A shop whose event has ticket sales open or closed from the start.
    pub async fn with_sales_open(open: bool) -> Self {
        let store = Arc::new(MemoryTicketStore::new());
        let event = store.add_event(EVENT, "Tracon", HOMEPAGE).await;
        let weekend = store
            .add_product(event.id, "Weekend ticket", Price::from_cents(3500), Some(2))
            .await;
        let saturday = store
            .add_product(event.id, "Saturday ticket", Price::from_cents(2500), None)
            .await;
        if !open {
            store.set_ticket_sales_open(event.id, false).await;
        }

        let state = AppState::new(config(), store.clone());
        let router = convention_tickets::app(state, MemoryStore::default());

        Self {
            store,
            event,
            products: vec![weekend, saturday],
            router,
        }
    }

    /// A browser with an empty cookie jar.
    #[must_use]
    pub fn client(&self) -> TestClient {
        TestClient {
            router: self.router.clone(),
            cookie: None,
        }
    }
}

/// Path of a wizard phase of the seeded event.
#[must_use]
pub fn phase_path(slug: &str) -> String {
    format!("/events/{EVENT}/tickets/{slug}")
}

/// Response with the body already read.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// The `Location` header of a redirect.
    #[must_use]
    pub fn location(&self) -> &str {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
    }

    /// Names of the product count inputs on a tickets page, in page order.
    #[must_use]
    pub fn count_fields(&self) -> Vec<String> {
        self.body
            .split("name=\"")
            .skip(1)
            .filter_map(|rest| rest.split('"').next())
            .filter(|name| name.starts_with('o') && name.ends_with("-count"))
            .map(String::from)
            .collect()
    }
}

/// Sends requests to the router, keeping the session cookie.
pub struct TestClient {
    router: Router,
    cookie: Option<String>,
}

impl TestClient {
    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Method::GET, path, None).await
    }

    /// GET `path` and follow in-shop redirects, returning the visited paths
    /// and the final response.
    ///
    /// # Panics
    ///
    /// Panics if the chain is longer than `max_hops`.
    pub async fn follow(&mut self, path: &str, max_hops: usize) -> (Vec<String>, TestResponse) {
        let mut visited = vec![path.to_string()];
        let mut response = self.get(path).await;
        while response.status.is_redirection() && response.location().starts_with('/') {
            assert!(visited.len() <= max_hops, "redirect loop: {visited:?}");
            let next = response.location().to_string();
            response = self.get(&next).await;
            visited.push(next);
        }
        (visited, response)
    }

    pub async fn post(&mut self, path: &str, form: &[(&str, &str)]) -> TestResponse {
        let body = form
            .iter()
            .map(|(key, value)| format!("{}={}", encode(key), encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn send(&mut self, method: Method, path: &str, form: Option<String>) -> TestResponse {
        let mut request = Request::builder().method(method).uri(path);
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = match form {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body)),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Valid address phase submission.
#[must_use]
pub fn customer_form() -> Vec<(&'static str, &'static str)> {
    vec![
        ("first_name", "Tero"),
        ("last_name", "Testaaja"),
        ("email", "tero@example.com"),
        ("phone", "+358 40 123 4567"),
        ("address", "Hämeenkatu 1"),
        ("postal_code", "33100"),
        ("city", "Tampere"),
        ("action", "next"),
    ]
}
