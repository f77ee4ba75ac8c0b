//! Google Geocoding API client

use super::Geocoder;
use crate::models::{AddressComponent, LatLng};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("hgd-server/", env!("CARGO_PKG_VERSION"));

/// Geocoding client errors
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Network failure, timeout or non-success HTTP status
    #[error("Geocoding transport error: {0}")]
    Transport(String),

    /// Service answered with a status other than "OK"
    #[error("Geocoding failed: {status}{}", detail(.message))]
    Status {
        status: String,
        message: Option<String>,
    },

    #[error("Geocoding response could not be parsed: {0}")]
    Parse(String),

    #[error("Geocoder returned invalid coordinates ({lat}, {lng})")]
    InvalidCoordinates { lat: f64, lng: f64 },

    #[error("Geocoding API key is not configured")]
    NotConfigured,
}

fn detail(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(" ({})", m))
        .unwrap_or_default()
}

impl GeocodeError {
    /// True when the address itself is at fault (no match, malformed request)
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            GeocodeError::Status { status, .. } if status == "ZERO_RESULTS" || status == "INVALID_REQUEST"
        )
    }
}

/// First candidate of a successful geocode
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeResult {
    pub formatted_address: String,
    pub location: LatLng,
    pub address_components: Vec<AddressComponent>,
    /// Absent for some result kinds and for self-hosted geocoders
    pub place_id: Option<String>,
    pub types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeCandidate>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeCandidate {
    formatted_address: String,
    geometry: CandidateGeometry,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
    #[serde(default)]
    place_id: Option<String>,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateGeometry {
    location: LatLng,
}

/// Map a decoded response to the first usable candidate
fn interpret_response(response: GeocodeResponse) -> Result<GeocodeResult, GeocodeError> {
    if response.status != "OK" {
        return Err(GeocodeError::Status {
            status: response.status,
            message: response.error_message,
        });
    }

    let first = response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| GeocodeError::Status {
            status: "ZERO_RESULTS".to_string(),
            message: None,
        })?;

    let location = first.geometry.location;
    if !location.is_valid() {
        return Err(GeocodeError::InvalidCoordinates {
            lat: location.lat,
            lng: location.lng,
        });
    }

    Ok(GeocodeResult {
        formatted_address: first.formatted_address,
        location,
        address_components: first.address_components,
        place_id: first.place_id.filter(|id| !id.trim().is_empty()),
        types: first.types,
    })
}

/// Google Geocoding API client
pub struct GoogleGeocodingClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl GoogleGeocodingClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self, GeocodeError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| GeocodeError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl Geocoder for GoogleGeocodingClient {
    async fn geocode(&self, address: &str) -> Result<GeocodeResult, GeocodeError> {
        let api_key = self.api_key.as_deref().ok_or(GeocodeError::NotConfigured)?;

        tracing::debug!(address = %address, url = %self.base_url, "Querying geocoding API");

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[("address", address), ("key", api_key)])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeocodeError::Transport(format!("request timed out: {}", e))
                } else {
                    GeocodeError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Transport(format!("HTTP {}", status.as_u16())));
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Parse(e.to_string()))?;

        let result = interpret_response(body)?;

        tracing::info!(
            address = %address,
            formatted_address = %result.formatted_address,
            place_id = %result.place_id.as_deref().unwrap_or("-"),
            "Geocoded address"
        );

        Ok(result)
    }
}
