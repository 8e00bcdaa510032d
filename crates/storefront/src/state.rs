//! Application state shared across handlers.
//!
//! Every external client is constructed exactly once here and shared
//! read-only for the life of the process.

use std::sync::Arc;

use sqlx::PgPool;

use crate::catalog::MenuCatalog;
use crate::config::StorefrontConfig;
use crate::db::{PgDeliveryZoneStore, PgOrderStore};
use crate::maps::{MapsClient, MapsError};
use crate::services::checkout::{CheckoutControllers, CheckoutService};
use crate::services::coupons::{CouponClient, CouponError};
use crate::services::delivery::DeliveryValidator;
use crate::services::notifications::SlackNotifier;
use crate::services::payments::{PaymentClient, PaymentError};

/// Error constructing an external client.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("maps client: {0}")]
    Maps(#[from] MapsError),
    #[error("coupon client: {0}")]
    Coupons(#[from] CouponError),
    #[error("payment client: {0}")]
    Payments(#[from] PaymentError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    catalog: MenuCatalog,
    checkout: CheckoutService,
    controllers: CheckoutControllers,
}

impl AppState {
    /// Build the state and every external client.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be constructed.
    pub fn new(
        config: StorefrontConfig,
        pool: PgPool,
        catalog: MenuCatalog,
    ) -> Result<Self, StateError> {
        let maps = Arc::new(MapsClient::new(&config.maps)?);
        let delivery = DeliveryValidator::new(
            maps.clone(),
            maps,
            Arc::new(PgDeliveryZoneStore::new(pool.clone())),
            config.maps.origin,
            config.checkout.delivery,
        );

        let mut checkout = CheckoutService::new(
            Arc::new(PgOrderStore::new(pool.clone())),
            Arc::new(PaymentClient::new(&config.payments)?),
            Arc::new(CouponClient::new(&config.coupons)?),
            delivery,
            config.checkout.pricing,
        );
        if let Some(slack) = &config.slack {
            checkout = checkout.with_notifier(Arc::new(SlackNotifier::new(slack)));
        } else {
            tracing::info!("Slack not configured, staff notifications disabled");
        }

        Ok(Self::from_parts(config, pool, catalog, checkout))
    }

    /// Assemble state around an already-built checkout service.
    #[must_use]
    pub fn from_parts(
        config: StorefrontConfig,
        pool: PgPool,
        catalog: MenuCatalog,
        checkout: CheckoutService,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog,
                checkout,
                controllers: CheckoutControllers::new(),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn catalog(&self) -> &MenuCatalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    /// Per-session checkout controllers.
    #[must_use]
    pub fn controllers(&self) -> &CheckoutControllers {
        &self.inner.controllers
    }
}
