//! Maps provider integration.
//!
//! Two capabilities are consumed by delivery validation:
//!
//! - [`PlaceResolver`]: turn a place id (from address autocomplete) or raw
//!   address text into verified coordinates and a postal code.
//! - [`DistanceService`]: driving time between two coordinates, traffic-aware
//!   when the provider has live data.
//!
//! [`MapsClient`] implements both against the Google Maps web services.

mod client;
pub mod types;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::MapsClient;

/// Errors that can occur when calling the maps provider.
#[derive(Debug, Error)]
pub enum MapsError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success HTTP status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Provider answered 200 with a non-OK status field.
    #[error("provider status {status}: {}", message.as_deref().unwrap_or("no details"))]
    Provider {
        status: String,
        message: Option<String>,
    },

    /// No place matched the id or address.
    #[error("no place found for {0}")]
    NotFound(String),

    /// No driving route between the two points.
    #[error("no driving route: {0}")]
    NoRoute(String),

    /// Response was missing a required field.
    #[error("parse error: {0}")]
    Parse(String),
}

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Returns `None` unless both values are finite and in range.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }

    /// `lat,lng` form used in provider query strings.
    #[must_use]
    pub fn to_query(self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

/// A provider-verified address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPlace {
    pub place_id: String,
    pub formatted_address: String,
    pub coordinates: Coordinates,
    /// Absent when the provider returns no postal code component.
    pub postal_code: Option<String>,
}

/// Driving time and distance between two points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveTime {
    /// Free-flow duration.
    pub duration_seconds: u64,
    /// Live-traffic duration, when available.
    pub traffic_seconds: Option<u64>,
    pub distance_meters: u64,
}

impl DriveTime {
    /// Authoritative drive time in whole minutes, rounded up.
    ///
    /// Traffic-aware duration wins over free-flow.
    #[must_use]
    pub fn minutes(&self) -> u32 {
        let seconds = self.traffic_seconds.unwrap_or(self.duration_seconds);
        u32::try_from(seconds.div_ceil(60)).unwrap_or(u32::MAX)
    }
}

/// Resolves place ids and address text into verified places.
#[async_trait]
pub trait PlaceResolver: Send + Sync {
    /// Look up a place id from autocomplete.
    async fn resolve(&self, place_id: &str) -> Result<ResolvedPlace, MapsError>;

    /// Geocode free-form address text. Used when the customer typed an
    /// address without picking a suggestion.
    async fn geocode(&self, address: &str) -> Result<ResolvedPlace, MapsError>;
}

/// Computes driving time between coordinates.
#[async_trait]
pub trait DistanceService: Send + Sync {
    async fn drive_time(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<DriveTime, MapsError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_validation() {
        assert!(Coordinates::new(40.7223, -73.9973).is_some());
        assert!(Coordinates::new(91.0, 0.0).is_none());
        assert!(Coordinates::new(0.0, -180.5).is_none());
        assert!(Coordinates::new(f64::NAN, 0.0).is_none());
        assert_eq!(
            Coordinates::new(40.5, -73.25).unwrap().to_query(),
            "40.5,-73.25"
        );
    }

    #[test]
    fn test_drive_minutes_round_up() {
        let drive = DriveTime {
            duration_seconds: 1081,
            traffic_seconds: None,
            distance_meters: 9000,
        };
        assert_eq!(drive.minutes(), 19);

        let exact = DriveTime {
            duration_seconds: 1200,
            ..drive
        };
        assert_eq!(exact.minutes(), 20);
    }

    #[test]
    fn test_drive_minutes_prefer_traffic() {
        let drive = DriveTime {
            duration_seconds: 900,
            traffic_seconds: Some(1380),
            distance_meters: 7000,
        };
        assert_eq!(drive.minutes(), 23);
    }
}
