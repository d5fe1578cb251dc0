//! Session layer configuration.
//!
//! Production uses the `PostgreSQL` store from `tower-sessions-sqlx-store`;
//! tests plug in `MemoryStore`.

use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

use crate::config::TicketsConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "tickets_session";

/// Idle time after which a checkout session is dropped (2 days).
const SESSION_EXPIRY_SECONDS: i64 = 2 * 24 * 60 * 60;

/// Create the session layer over `store`.
///
/// Cookies are marked `Secure` when the shop is served over HTTPS.
#[must_use]
pub fn create_session_layer<S>(store: S, config: &TicketsConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
