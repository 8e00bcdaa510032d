//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Session cookie signing key (min 64 chars, high entropy)
//! - `MAPS_API_KEY` - Maps platform key (places, geocoding, distance matrix)
//! - `RESTAURANT_LATITUDE` / `RESTAURANT_LONGITUDE` - Kitchen location, origin of every drive
//! - `PAYMENTS_API_URL` - Payment intent service base URL
//! - `PAYMENTS_SECRET_KEY` - Server-side payment key
//! - `PAYMENTS_PUBLISHABLE_KEY` - Browser-side payment key returned to the client
//! - `COUPONS_API_URL` - Coupon validation endpoint
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_MENU_PATH` - Menu catalog JSON (default: crates/storefront/menu.json)
//! - `MAPS_API_BASE_URL` - Maps API root (default: <https://maps.googleapis.com/maps/api>)
//! - `COUPONS_API_KEY` - Bearer key for the coupon endpoint
//! - `SLACK_BOT_TOKEN` / `SLACK_ORDERS_CHANNEL` - Staff order notifications (both or neither)
//! - `CHECKOUT_TAX_RATE` - Sales tax fraction (default: 0.08875)
//! - `CHECKOUT_DELIVERY_FEE` - Delivery fee in dollars (default: 5.00)
//! - `DELIVERY_MAX_MINUTES` - Advertised delivery radius in drive minutes (default: 20)
//! - `DELIVERY_GRACE_MINUTES` - Extra minutes tolerated for traffic noise (default: 5)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;
use saffron_core::PricingPolicy;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::maps::Coordinates;
use crate::services::delivery::DeliveryPolicy;

const MIN_SESSION_SECRET_LENGTH: usize = 64;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "insert",
    "put-your",
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

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Session cookie signing key
    pub session_secret: SecretString,
    /// Path to the menu catalog JSON file
    pub menu_path: PathBuf,
    pub maps: MapsConfig,
    pub payments: PaymentsConfig,
    pub coupons: CouponsConfig,
    /// Staff notifications, disabled when unset
    pub slack: Option<SlackConfig>,
    pub checkout: CheckoutConfig,
    pub sentry: SentryConfig,
}

/// Maps platform configuration.
#[derive(Clone)]
pub struct MapsConfig {
    pub api_key: SecretString,
    /// API root, overridable for tests
    pub base_url: String,
    /// Kitchen coordinates; every drive time is measured from here
    pub origin: Coordinates,
}

impl std::fmt::Debug for MapsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapsConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Payment intent service configuration.
#[derive(Clone)]
pub struct PaymentsConfig {
    pub api_url: String,
    pub secret_key: SecretString,
    /// Safe to expose to the browser
    pub publishable_key: String,
}

impl std::fmt::Debug for PaymentsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentsConfig")
            .field("api_url", &self.api_url)
            .field("secret_key", &"[REDACTED]")
            .field("publishable_key", &self.publishable_key)
            .finish()
    }
}

/// Coupon validation endpoint configuration.
#[derive(Clone)]
pub struct CouponsConfig {
    pub api_url: String,
    pub api_key: Option<SecretString>,
}

impl std::fmt::Debug for CouponsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CouponsConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Slack bot used for new-order messages.
#[derive(Clone)]
pub struct SlackConfig {
    pub bot_token: SecretString,
    pub channel: String,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &"[REDACTED]")
            .field("channel", &self.channel)
            .finish()
    }
}

/// Pricing and delivery-zone policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckoutConfig {
    pub pricing: PricingPolicy,
    pub delivery: DeliveryPolicy,
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl StorefrontConfig {
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

        let session_secret = get_validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        Ok(Self {
            database_url: get_database_url("STOREFRONT_DATABASE_URL")?,
            host: parse_env_or("STOREFRONT_HOST", "127.0.0.1")?,
            port: parse_env_or("STOREFRONT_PORT", "3000")?,
            base_url: get_required_env("STOREFRONT_BASE_URL")?,
            session_secret,
            menu_path: PathBuf::from(get_env_or_default(
                "STOREFRONT_MENU_PATH",
                "crates/storefront/menu.json",
            )),
            maps: MapsConfig::from_env()?,
            payments: PaymentsConfig::from_env()?,
            coupons: CouponsConfig {
                api_url: get_required_env("COUPONS_API_URL")?,
                api_key: get_optional_env("COUPONS_API_KEY").map(SecretString::from),
            },
            slack: SlackConfig::from_env()?,
            checkout: CheckoutConfig::from_env()?,
            sentry: SentryConfig {
                dsn: get_optional_env("SENTRY_DSN"),
                environment: get_optional_env("SENTRY_ENVIRONMENT"),
                sample_rate: parse_env_or("SENTRY_SAMPLE_RATE", "1.0")?,
                traces_sample_rate: parse_env_or("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
            },
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should be marked `Secure`.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl MapsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let latitude: f64 = parse_required_env("RESTAURANT_LATITUDE")?;
        let longitude: f64 = parse_required_env("RESTAURANT_LONGITUDE")?;
        let origin = Coordinates::new(latitude, longitude).ok_or_else(|| {
            ConfigError::InvalidEnvVar(
                "RESTAURANT_LATITUDE".to_string(),
                format!("({latitude}, {longitude}) is not a valid coordinate"),
            )
        })?;

        Ok(Self {
            api_key: get_validated_secret("MAPS_API_KEY")?,
            base_url: get_env_or_default(
                "MAPS_API_BASE_URL",
                "https://maps.googleapis.com/maps/api",
            ),
            origin,
        })
    }
}

impl PaymentsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: get_required_env("PAYMENTS_API_URL")?,
            secret_key: get_validated_secret("PAYMENTS_SECRET_KEY")?,
            publishable_key: get_required_env("PAYMENTS_PUBLISHABLE_KEY")?,
        })
    }
}

impl SlackConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        match (
            get_optional_env("SLACK_BOT_TOKEN"),
            get_optional_env("SLACK_ORDERS_CHANNEL"),
        ) {
            (Some(token), Some(channel)) => Ok(Some(Self {
                bot_token: SecretString::from(token),
                channel,
            })),
            (None, None) => Ok(None),
            (Some(_), None) => Err(ConfigError::MissingEnvVar(
                "SLACK_ORDERS_CHANNEL".to_string(),
            )),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar("SLACK_BOT_TOKEN".to_string())),
        }
    }
}

impl CheckoutConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let pricing = PricingPolicy {
            tax_rate: parse_env_or::<Decimal>("CHECKOUT_TAX_RATE", "0.08875")?,
            delivery_fee: parse_env_or::<Decimal>("CHECKOUT_DELIVERY_FEE", "5.00")?,
        };
        if pricing.tax_rate.is_sign_negative() || pricing.delivery_fee.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "CHECKOUT_TAX_RATE".to_string(),
                "tax rate and delivery fee must not be negative".to_string(),
            ));
        }

        let delivery = DeliveryPolicy {
            max_minutes: parse_env_or("DELIVERY_MAX_MINUTES", "20")?,
            grace_minutes: parse_env_or("DELIVERY_GRACE_MINUTES", "5")?,
        };
        if delivery.max_minutes == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "DELIVERY_MAX_MINUTES".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self { pricing, delivery })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a required environment variable.
fn parse_required_env<T>(key: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_required_env(key)?)
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

/// Validate that a session secret is long enough to be a signing key.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let len = secret.expose_secret().len();
    if len < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_SESSION_SECRET_LENGTH} characters (got {len})"),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // Secret lengths are far below f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

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
