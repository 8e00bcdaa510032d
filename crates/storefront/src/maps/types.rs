//! Google Maps web service response shapes.
//!
//! Only the fields delivery validation reads are modelled.
//!
//! See: <https://developers.google.com/maps/documentation/places/web-service/details>,
//! <https://developers.google.com/maps/documentation/geocoding/requests-geocoding>,
//! <https://developers.google.com/maps/documentation/distance-matrix/distance-matrix>

use serde::Deserialize;

use super::{Coordinates, DriveTime, MapsError, ResolvedPlace};

/// Status value for a successful response or element.
pub const STATUS_OK: &str = "OK";
/// Status value when nothing matched.
pub const STATUS_ZERO_RESULTS: &str = "ZERO_RESULTS";
/// Place Details status for an unknown place id.
pub const STATUS_NOT_FOUND: &str = "NOT_FOUND";

/// Place Details response.
#[derive(Debug, Deserialize)]
pub struct PlaceDetailsResponse {
    pub status: String,
    #[serde(default)]
    pub result: Option<PlaceResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Geocoding response.
#[derive(Debug, Deserialize)]
pub struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<PlaceResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// A place as returned by Place Details and Geocoding.
#[derive(Debug, Deserialize)]
pub struct PlaceResult {
    pub place_id: String,
    #[serde(default)]
    pub formatted_address: Option<String>,
    pub geometry: Geometry,
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
}

impl PlaceResult {
    fn postal_code(&self) -> Option<String> {
        self.address_components
            .iter()
            .find(|c| c.types.iter().any(|t| t == "postal_code"))
            .map(|c| c.long_name.trim().to_string())
            .filter(|code| !code.is_empty())
    }

    /// Convert into a [`ResolvedPlace`], validating the coordinates.
    ///
    /// # Errors
    ///
    /// Returns `MapsError::Parse` if the location is out of range.
    pub fn into_resolved(self, fallback_address: &str) -> Result<ResolvedPlace, MapsError> {
        let LatLng { lat, lng } = self.geometry.location;
        let coordinates = Coordinates::new(lat, lng)
            .ok_or_else(|| MapsError::Parse(format!("invalid location ({lat}, {lng})")))?;
        let postal_code = self.postal_code();

        Ok(ResolvedPlace {
            place_id: self.place_id,
            formatted_address: self
                .formatted_address
                .unwrap_or_else(|| fallback_address.to_string()),
            coordinates,
            postal_code,
        })
    }
}

/// Distance Matrix response.
#[derive(Debug, Deserialize)]
pub struct DistanceMatrixResponse {
    pub status: String,
    #[serde(default)]
    pub rows: Vec<MatrixRow>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MatrixRow {
    pub elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
pub struct MatrixElement {
    pub status: String,
    #[serde(default)]
    pub duration: Option<ValueText>,
    #[serde(default)]
    pub duration_in_traffic: Option<ValueText>,
    #[serde(default)]
    pub distance: Option<ValueText>,
}

/// A `{ value, text }` pair; `value` is seconds or meters.
#[derive(Debug, Deserialize)]
pub struct ValueText {
    pub value: u64,
    #[serde(default)]
    pub text: Option<String>,
}

impl DistanceMatrixResponse {
    /// Extract the single origin/destination element.
    ///
    /// # Errors
    ///
    /// Returns `MapsError::Provider` for a non-OK top-level status,
    /// `MapsError::NoRoute` for a non-OK element, and `MapsError::Parse` when
    /// the element or its duration is missing.
    pub fn into_drive_time(self) -> Result<DriveTime, MapsError> {
        if self.status != STATUS_OK {
            return Err(MapsError::Provider {
                status: self.status,
                message: self.error_message,
            });
        }

        let element = self
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.elements.into_iter().next())
            .ok_or_else(|| MapsError::Parse("distance matrix has no elements".to_string()))?;

        if element.status != STATUS_OK {
            return Err(MapsError::NoRoute(element.status));
        }

        let duration = element
            .duration
            .ok_or_else(|| MapsError::Parse("element has no duration".to_string()))?;

        Ok(DriveTime {
            duration_seconds: duration.value,
            traffic_seconds: element.duration_in_traffic.map(|d| d.value),
            distance_meters: element.distance.map_or(0, |d| d.value),
        })
    }
}
