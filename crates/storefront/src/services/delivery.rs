//! Delivery zone validation.
//!
//! Classifies an address as deliverable by driving time from the kitchen.
//! The zone store caches drive times per postal code so repeat customers in
//! a known area never hit the distance API.
//!
//! Two entry points:
//!
//! - **Resolved place**: the customer picked an autocomplete suggestion, so
//!   the place id is trusted. An over-limit or unroutable address aborts
//!   checkout with a pickup suggestion.
//! - **Text only**: the customer typed an address. It is geocoded and run
//!   through the same pipeline, but nothing blocks checkout; the worst
//!   outcome is a warning.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::db::RepositoryError;
use crate::maps::{Coordinates, DistanceService, PlaceResolver, ResolvedPlace};
use crate::services::bounded::{BoundedError, bounded_try};

/// Advertised delivery radius and the traffic tolerance above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    /// Hard limit in drive minutes.
    pub max_minutes: u32,
    /// Added to the hard limit before an address is rejected.
    pub grace_minutes: u32,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            max_minutes: 20,
            grace_minutes: 5,
        }
    }
}

impl DeliveryPolicy {
    /// Largest drive time still accepted.
    #[must_use]
    pub const fn soft_limit(&self) -> u32 {
        self.max_minutes.saturating_add(self.grace_minutes)
    }
}

/// Deadline for each lookup inside one validation.
///
/// Each path sums below its checkout budget (20 s resolved, 35 s text), so a
/// hung distance call is classified here rather than by the outer deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupBudgets {
    pub place: Duration,
    pub geocode: Duration,
    /// Zone store reads and writes.
    pub zone_store: Duration,
    pub distance: Duration,
}

impl Default for LookupBudgets {
    fn default() -> Self {
        Self {
            place: Duration::from_secs(5),
            geocode: Duration::from_secs(15),
            zone_store: Duration::from_secs(2),
            distance: Duration::from_secs(8),
        }
    }
}

/// A cached postal code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneEntry {
    pub postal_code: String,
    pub estimated_minutes: u32,
    pub active: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Persistent postal code to drive-time cache.
#[async_trait]
pub trait DeliveryZoneStore: Send + Sync {
    async fn find(&self, postal_code: &str) -> Result<Option<ZoneEntry>, RepositoryError>;

    /// Insert or refresh the estimate for a postal code.
    async fn upsert(&self, postal_code: &str, minutes: u32) -> Result<(), RepositoryError>;
}

/// What the customer gave us to locate them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressInput {
    /// Place id from address autocomplete.
    Resolved { place_id: String },
    /// Raw address text.
    Text(String),
}

impl AddressInput {
    /// Prefer the place id when one was supplied.
    #[must_use]
    pub fn new(place_id: Option<&str>, address: &str) -> Self {
        match place_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => Self::Resolved {
                place_id: id.to_string(),
            },
            None => Self::Text(address.trim().to_string()),
        }
    }

    #[must_use]
    pub const fn is_text_only(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

/// Why an address was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfZoneReason {
    /// Drive time is above the soft limit.
    TooFar,
    /// The postal code was deactivated by an operator.
    ZoneClosed,
    /// The distance check failed, so delivery cannot be promised.
    RouteUnavailable,
}

/// Terminal classification of an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum DeliveryOutcome {
    InZone {
        estimated_minutes: u32,
        postal_code: Option<String>,
        formatted_address: String,
        /// Answered from the zone store without a distance call.
        cached: bool,
    },
    OutOfZone {
        reason: OutOfZoneReason,
        estimated_minutes: Option<u32>,
        suggest_pickup: bool,
    },
    /// Checkout may continue, with `warning` shown to the customer.
    Unverifiable { warning: String },
}

const UNVERIFIED_WARNING: &str =
    "We couldn't verify your delivery address. Your order will go through, but please double-check the address.";

/// Warning when address lookup outlives its budget.
pub const DELIVERY_TIMEOUT_WARNING: &str =
    "We couldn't verify your delivery address in time. Your order will go through, but please double-check the address.";

impl DeliveryOutcome {
    fn out_of_zone(reason: OutOfZoneReason, estimated_minutes: Option<u32>) -> Self {
        Self::OutOfZone {
            reason,
            estimated_minutes,
            suggest_pickup: true,
        }
    }

    fn unverifiable() -> Self {
        Self::Unverifiable {
            warning: UNVERIFIED_WARNING.to_string(),
        }
    }

    /// Unverifiable because a lookup ran out of time.
    #[must_use]
    pub fn timed_out() -> Self {
        Self::Unverifiable {
            warning: DELIVERY_TIMEOUT_WARNING.to_string(),
        }
    }

    /// Whether checkout may proceed.
    #[must_use]
    pub const fn allows_checkout(&self) -> bool {
        !matches!(self, Self::OutOfZone { .. })
    }

    #[must_use]
    pub const fn estimated_minutes(&self) -> Option<u32> {
        match self {
            Self::InZone {
                estimated_minutes, ..
            } => Some(*estimated_minutes),
            Self::OutOfZone {
                estimated_minutes, ..
            } => *estimated_minutes,
            Self::Unverifiable { .. } => None,
        }
    }

    /// Customer-facing explanation for a rejected or unverified address.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::InZone { .. } => None,
            Self::OutOfZone {
                reason: OutOfZoneReason::TooFar,
                estimated_minutes,
                ..
            } => Some(format!(
                "Sorry, this address is about {} minutes away, outside our delivery area. Would you like to order for pickup instead?",
                estimated_minutes.unwrap_or_default()
            )),
            Self::OutOfZone {
                reason: OutOfZoneReason::ZoneClosed,
                ..
            } => Some(
                "We're not delivering to this area right now. Would you like to order for pickup instead?"
                    .to_string(),
            ),
            Self::OutOfZone {
                reason: OutOfZoneReason::RouteUnavailable,
                ..
            } => Some(
                "We couldn't confirm delivery to this address. Please try pickup instead."
                    .to_string(),
            ),
            Self::Unverifiable { warning } => Some(warning.clone()),
        }
    }
}

/// Classifies delivery addresses against the zone store and live drive times.
#[derive(Clone)]
pub struct DeliveryValidator {
    places: Arc<dyn PlaceResolver>,
    distance: Arc<dyn DistanceService>,
    zones: Arc<dyn DeliveryZoneStore>,
    origin: Coordinates,
    policy: DeliveryPolicy,
    budgets: LookupBudgets,
}

impl DeliveryValidator {
    #[must_use]
    pub fn new(
        places: Arc<dyn PlaceResolver>,
        distance: Arc<dyn DistanceService>,
        zones: Arc<dyn DeliveryZoneStore>,
        origin: Coordinates,
        policy: DeliveryPolicy,
    ) -> Self {
        Self {
            places,
            distance,
            zones,
            origin,
            policy,
            budgets: LookupBudgets::default(),
        }
    }

    #[must_use]
    pub const fn with_budgets(mut self, budgets: LookupBudgets) -> Self {
        self.budgets = budgets;
        self
    }

    #[must_use]
    pub const fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    /// Classify an address. Never fails: provider errors become outcomes.
    #[instrument(skip(self, input), fields(text_only = input.is_text_only()))]
    pub async fn validate(&self, input: &AddressInput) -> DeliveryOutcome {
        let (lookup, text_only) = match input {
            AddressInput::Resolved { place_id } => (
                bounded_try("place_resolve", self.budgets.place, self.places.resolve(place_id))
                    .await,
                false,
            ),
            AddressInput::Text(address) => (
                bounded_try("geocode", self.budgets.geocode, self.places.geocode(address)).await,
                true,
            ),
        };
        let place = match lookup {
            Ok(place) => place,
            Err(BoundedError::TimedOut(_)) => return DeliveryOutcome::timed_out(),
            Err(BoundedError::Failed(e)) => {
                warn!(error = %e, text_only, "Address lookup failed");
                return DeliveryOutcome::unverifiable();
            }
        };

        let outcome = self.classify(place).await;

        // Geocoded text may not be the address the customer meant
        if text_only && !outcome.allows_checkout() {
            info!(?outcome, "Downgrading text-only rejection to a warning");
            return DeliveryOutcome::unverifiable();
        }
        outcome
    }

    #[instrument(skip(self, place), fields(postal_code = place.postal_code.as_deref()))]
    async fn classify(&self, place: ResolvedPlace) -> DeliveryOutcome {
        if let Some(postal_code) = place.postal_code.as_deref() {
            let lookup =
                bounded_try("zone_lookup", self.budgets.zone_store, self.zones.find(postal_code));
            match lookup.await {
                Ok(Some(zone)) if zone.active => {
                    debug!(minutes = zone.estimated_minutes, "Zone cache hit");
                    return DeliveryOutcome::InZone {
                        estimated_minutes: zone.estimated_minutes,
                        postal_code: Some(zone.postal_code),
                        formatted_address: place.formatted_address,
                        cached: true,
                    };
                }
                Ok(Some(_)) => {
                    info!("Postal code is deactivated");
                    return DeliveryOutcome::out_of_zone(OutOfZoneReason::ZoneClosed, None);
                }
                Ok(None) => debug!("Zone cache miss"),
                Err(e) => warn!(error = %e, "Zone lookup failed, measuring drive time"),
            }
        }

        let drive = bounded_try(
            "distance",
            self.budgets.distance,
            self.distance.drive_time(self.origin, place.coordinates),
        );
        let minutes = match drive.await {
            Ok(drive) => drive.minutes(),
            Err(e) => {
                warn!(error = %e, "Distance lookup failed");
                return DeliveryOutcome::out_of_zone(OutOfZoneReason::RouteUnavailable, None);
            }
        };

        if minutes > self.policy.soft_limit() {
            info!(minutes, limit = self.policy.soft_limit(), "Address outside delivery area");
            return DeliveryOutcome::out_of_zone(OutOfZoneReason::TooFar, Some(minutes));
        }

        if let Some(postal_code) = place.postal_code.as_deref()
            && let Err(e) = bounded_try(
                "zone_upsert",
                self.budgets.zone_store,
                self.zones.upsert(postal_code, minutes),
            )
            .await
        {
            warn!(error = %e, "Failed to cache delivery zone");
        }

        DeliveryOutcome::InZone {
            estimated_minutes: minutes,
            postal_code: place.postal_code,
            formatted_address: place.formatted_address,
            cached: false,
        }
    }
}
