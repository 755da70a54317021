//! HTTP geocoding client: forward, reverse and autocomplete lookups.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::NetworkConfig;
use crate::traits::Geocoder;

/// Display string used when a position cannot be reverse-geocoded.
pub const UNKNOWN_LOCATION: &str =
    "Unable to determine the location for the provided address.";

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Outcome of a successful forward geocode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub position: GeoPoint,
    pub formatted_address: String,
}

/// Error raised by geocoding lookups.
#[derive(Debug, Clone, Error)]
pub enum GeocodeError {
    /// The provider answered but had no result for the query.
    #[error("no result for the requested location")]
    NotFound,
    /// The provider could not be reached or answered with an error.
    #[error("geocoding service unavailable: {0}")]
    ServiceUnavailable(String),
}

// Wire format of the provider responses.

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeEntry>,
}

#[derive(Debug, Deserialize)]
struct GeocodeEntry {
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: GeoPoint,
}

#[derive(Debug, Deserialize)]
struct AutocompleteResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    description: String,
}

/// Geocoding client over the provider's JSON API.
#[derive(Clone, Debug)]
pub struct HttpGeocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpGeocoder {
    /// Create a new client with configurable timeouts.
    pub fn new(base_url: String, api_key: String, network_config: &NetworkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(network_config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(network_config.connect_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    async fn geocode_query(&self, query: &[(&str, String)]) -> Result<GeocodeResponse, GeocodeError> {
        let mut params = query.to_vec();
        params.push(("key", self.api_key.clone()));

        let response = self
            .client
            .get(format!("{}/geocode", self.base_url))
            .query(&params)
            .send()
            .await
            .map_err(|e| GeocodeError::ServiceUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::ServiceUnavailable(format!(
                "status {status}"
            )));
        }

        response
            .json::<GeocodeResponse>()
            .await
            .map_err(|e| GeocodeError::ServiceUnavailable(e.to_string()))
    }
}

impl Geocoder for HttpGeocoder {
    async fn forward(&self, address: &str) -> Result<GeocodeResult, GeocodeError> {
        let body = self
            .geocode_query(&[("address", address.to_string())])
            .await?;

        match body.results.into_iter().next() {
            Some(entry) if body.status == "OK" => {
                tracing::debug!(address, "forward geocode hit");
                Ok(GeocodeResult {
                    position: entry.geometry.location,
                    formatted_address: entry.formatted_address,
                })
            }
            _ => Err(GeocodeError::NotFound),
        }
    }

    async fn reverse(&self, position: GeoPoint) -> Result<String, GeocodeError> {
        let body = self
            .geocode_query(&[("latlng", format!("{},{}", position.lat, position.lng))])
            .await?;

        match body.results.into_iter().next() {
            Some(entry) if body.status == "OK" => Ok(entry.formatted_address),
            _ => Err(GeocodeError::NotFound),
        }
    }

    async fn suggest(&self, partial: &str) -> Result<Vec<String>, GeocodeError> {
        if partial.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .get(format!("{}/autocomplete", self.base_url))
            .query(&[("input", partial), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| GeocodeError::ServiceUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::ServiceUnavailable(format!(
                "status {status}"
            )));
        }

        let body = response
            .json::<AutocompleteResponse>()
            .await
            .map_err(|e| GeocodeError::ServiceUnavailable(e.to_string()))?;

        Ok(body.predictions.into_iter().map(|p| p.description).collect())
    }
}
