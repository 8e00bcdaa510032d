//! Google Maps web services client.
//!
//! Resolved places are cached for 5 minutes keyed by place id, so the
//! delivery pre-check and the checkout submit that follows it share one
//! lookup.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::types::{
    DistanceMatrixResponse, GeocodeResponse, PlaceDetailsResponse, STATUS_NOT_FOUND, STATUS_OK,
    STATUS_ZERO_RESULTS,
};
use super::{Coordinates, DistanceService, DriveTime, MapsError, PlaceResolver, ResolvedPlace};
use crate::config::MapsConfig;

/// Transport timeout, independent of the checkout step budgets.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const PLACE_FIELDS: &str = "place_id,formatted_address,geometry/location,address_components";

/// Maps API client shared by delivery validation.
#[derive(Clone)]
pub struct MapsClient {
    inner: Arc<MapsClientInner>,
}

struct MapsClientInner {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    places: Cache<String, ResolvedPlace>,
}

impl std::fmt::Debug for MapsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapsClient")
            .field("base_url", &self.inner.base_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl MapsClient {
    /// Create a new maps client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &MapsConfig) -> Result<Self, MapsError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let places = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(MapsClientInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                api_key: config.api_key.clone(),
                places,
            }),
        })
    }

    /// GET `{base}/{path}` with the API key appended, decoding JSON.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, MapsError> {
        let url = Url::parse_with_params(
            &format!("{}/{path}", self.inner.base_url),
            params
                .iter()
                .copied()
                .chain([("key", self.inner.api_key.expose_secret())]),
        )
        .map_err(|e| MapsError::Parse(format!("invalid maps URL: {e}")))?;

        let response = self.inner.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MapsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| MapsError::Parse(e.to_string()))
    }
}

#[async_trait]
impl PlaceResolver for MapsClient {
    #[instrument(skip(self))]
    async fn resolve(&self, place_id: &str) -> Result<ResolvedPlace, MapsError> {
        if let Some(place) = self.inner.places.get(place_id).await {
            debug!("Cache hit for place");
            return Ok(place);
        }

        let response: PlaceDetailsResponse = self
            .get_json(
                "place/details/json",
                &[("place_id", place_id), ("fields", PLACE_FIELDS)],
            )
            .await?;

        let place = match response.status.as_str() {
            STATUS_OK => response
                .result
                .ok_or_else(|| MapsError::NotFound(place_id.to_string()))?
                .into_resolved(place_id)?,
            STATUS_NOT_FOUND | STATUS_ZERO_RESULTS => {
                return Err(MapsError::NotFound(place_id.to_string()));
            }
            _ => {
                return Err(MapsError::Provider {
                    status: response.status.clone(),
                    message: response.error_message,
                });
            }
        };

        self.inner
            .places
            .insert(place_id.to_string(), place.clone())
            .await;
        Ok(place)
    }

    #[instrument(skip(self, address))]
    async fn geocode(&self, address: &str) -> Result<ResolvedPlace, MapsError> {
        let response: GeocodeResponse = self
            .get_json("geocode/json", &[("address", address)])
            .await?;

        match response.status.as_str() {
            STATUS_OK => response
                .results
                .into_iter()
                .next()
                .ok_or_else(|| MapsError::NotFound(address.to_string()))?
                .into_resolved(address),
            STATUS_ZERO_RESULTS => Err(MapsError::NotFound(address.to_string())),
            _ => Err(MapsError::Provider {
                status: response.status.clone(),
                message: response.error_message,
            }),
        }
    }
}

#[async_trait]
impl DistanceService for MapsClient {
    #[instrument(skip(self))]
    async fn drive_time(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<DriveTime, MapsError> {
        let origins = origin.to_query();
        let destinations = destination.to_query();

        let response: DistanceMatrixResponse = self
            .get_json(
                "distancematrix/json",
                &[
                    ("origins", origins.as_str()),
                    ("destinations", destinations.as_str()),
                    ("mode", "driving"),
                    ("departure_time", "now"),
                ],
            )
            .await?;

        let drive = response.into_drive_time()?;
        debug!(minutes = drive.minutes(), "Drive time computed");
        Ok(drive)
    }
}
