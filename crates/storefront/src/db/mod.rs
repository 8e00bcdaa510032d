//! Database operations for the storefront `PostgreSQL`.
//!
//! ## Tables
//!
//! - `users` - Customer accounts referenced by orders (managed elsewhere)
//! - `orders` - Immutable order records, one row per checkout that reaches insert
//! - `delivery_zones` - Postal code to drive-time cache
//! - `tower_sessions.session` - Tower-sessions storage (cart, pending order)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p saffron-cli -- migrate
//! ```

pub mod delivery_zones;
pub mod orders;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use delivery_zones::PgDeliveryZoneStore;
pub use orders::{OrderInsertError, OrderRepository, PgOrderStore};

/// Errors from repository reads and updates.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value no longer passes domain validation.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// A value to be written does not fit its column.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// Requested row was not found.
    #[error("not found")]
    NotFound,

    /// Row exists but is in the wrong state for this update.
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
