//! Ticket shop configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TICKETS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `TICKETS_BASE_URL` - Public URL of the ticket shop
//! - `TICKETS_SESSION_SECRET` - Session secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `TICKETS_HOST` - Bind address (default: 127.0.0.1)
//! - `TICKETS_PORT` - Listen port (default: 3000)
//! - `TICKETS_PAYMENT_URL` - Payment initiation endpoint (default: `http://localhost:8000/process/`)
//! - `TICKETS_EVENT_CACHE_TTL` - Seconds an event lookup is cached (default: 60)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name (default: derived from base URL)
//! - `SENTRY_SAMPLE_RATE` - Error sample rate 0.0-1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate 0.0-1.0 (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default payment initiation endpoint for local development.
pub const DEFAULT_PAYMENT_URL: &str = "http://localhost:8000/process/";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Ticket shop configuration.
#[derive(Debug, Clone)]
pub struct TicketsConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    /// Public base URL, decides whether cookies are `Secure`
    pub base_url: String,
    pub session_secret: SecretString,
    /// Where the confirm phase sends buyers to pay
    pub payment_url: Url,
    /// How long event lookups are cached
    pub event_cache_ttl: Duration,
    pub sentry: SentryConfig,
}

/// Error tracking settings.
#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: String,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl TicketsConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("TICKETS_DATABASE_URL")?;
        let host = parse_env("TICKETS_HOST", "127.0.0.1")?;
        let port = parse_env("TICKETS_PORT", "3000")?;
        let base_url = get_required_env("TICKETS_BASE_URL")?;
        let session_secret = get_validated_secret("TICKETS_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "TICKETS_SESSION_SECRET")?;
        let payment_url = parse_env("TICKETS_PAYMENT_URL", DEFAULT_PAYMENT_URL)?;
        let event_cache_ttl = Duration::from_secs(parse_env("TICKETS_EVENT_CACHE_TTL", "60")?);
        let sentry = SentryConfig::from_env(&base_url)?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            payment_url,
            event_cache_ttl,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the shop is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl SentryConfig {
    fn from_env(base_url: &str) -> Result<Self, ConfigError> {
        let default_environment = if base_url.contains("localhost") || base_url.contains("127.0.0.1") {
            "development"
        } else {
            "production"
        };
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_env_or_default("SENTRY_ENVIRONMENT", default_environment),
            sample_rate: parse_rate("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_rate("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get the database URL, falling back to the generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a sample rate, which must lie in `0.0..=1.0`.
fn parse_rate(key: &str, default: &str) -> Result<f32, ConfigError> {
    let rate: f32 = parse_env(key, default)?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("{rate} is outside 0.0..=1.0"),
        ))
    }
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_repeated_char_is_zero() {
        assert!((shannon_entropy("zzzzzzzz") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("xyxy");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_placeholder_secrets_are_rejected() {
        for value in ["your-session-key", "CHANGEME-please-9f8e7d", "tickets-secret-Qw3rTy"] {
            let err = validate_secret_strength(value, "TICKETS_SESSION_SECRET").unwrap_err();
            assert!(matches!(err, ConfigError::InsecureSecret(_, _)), "{value}");
        }
    }

    #[test]
    fn test_low_entropy_secret_is_rejected() {
        let result = validate_secret_strength(&"ab".repeat(20), "TICKETS_SESSION_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_random_secret_is_accepted() {
        let result = validate_secret_strength("k9#Lm2$Vq7!Rt4&Wz8*Hc1^Nd6@Pb3%Jy", "TICKETS_SESSION_SECRET");
        assert!(result.is_ok());
    }

    #[test]
    fn test_session_secret_length() {
        let short = SecretString::from("k9#Lm2$Vq7!R");
        assert!(validate_session_secret(&short, "TICKETS_SESSION_SECRET").is_err());

        let long = SecretString::from("k".repeat(MIN_SESSION_SECRET_LENGTH));
        assert!(validate_session_secret(&long, "TICKETS_SESSION_SECRET").is_ok());
    }

    #[test]
    fn test_payment_url_default_parses() {
        let url = Url::parse(DEFAULT_PAYMENT_URL).unwrap();
        assert_eq!(url.path(), "/process/");
    }

    #[test]
    fn test_socket_addr_and_secure_flag() {
        let config = TicketsConfig {
            database_url: SecretString::from("postgres://localhost/tickets"),
            host: "0.0.0.0".parse().unwrap(),
            port: 3000,
            base_url: "https://tickets.tracon.fi".to_string(),
            session_secret: SecretString::from("k".repeat(32)),
            payment_url: Url::parse(DEFAULT_PAYMENT_URL).unwrap(),
            event_cache_ttl: Duration::from_secs(60),
            sentry: SentryConfig {
                dsn: None,
                environment: "production".to_string(),
                sample_rate: 1.0,
                traces_sample_rate: 0.1,
            },
        };

        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:3000");
        assert!(config.is_secure());
    }
}
