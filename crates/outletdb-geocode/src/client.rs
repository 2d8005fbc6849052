//! HTTP client for the Google Geocoding and Place Details APIs.
//!
//! One call to [`GoogleGeocoder::geocode`] or
//! [`GoogleGeocoder::opening_hours`] is exactly one HTTP request. Retries and
//! rate limiting are applied by the [`Enricher`](crate::Enricher) so that
//! every request, including repeats, passes through the limiter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::GeocodeError;

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/";
const GEOCODE_PATH: &str = "maps/api/geocode/json";
const PLACE_DETAILS_PATH: &str = "maps/api/place/details/json";

/// The first geocoding result for an address.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeMatch {
    pub latitude: f64,
    pub longitude: f64,
    /// Handle for follow-up Place Details lookups, when the service gives one.
    pub place_id: Option<String>,
}

/// Resolves a free-text address to coordinates and looks up published hours.
#[async_trait]
pub trait GeocodeService: Send + Sync {
    /// # Errors
    ///
    /// Returns [`GeocodeError::NoMatch`] when the address is unknown to the
    /// service, or another variant on transport or service failure.
    async fn geocode(&self, address: &str) -> Result<GeocodeMatch, GeocodeError>;

    /// Weekly opening hours for a place, one line per day. Empty when the
    /// place publishes none.
    ///
    /// # Errors
    ///
    /// Returns a [`GeocodeError`] on transport or service failure.
    async fn opening_hours(&self, place_id: &str) -> Result<Vec<String>, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
    place_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct PlaceDetailsResponse {
    status: String,
    result: Option<PlaceDetails>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceDetails {
    opening_hours: Option<OpeningHours>,
}

#[derive(Debug, Deserialize)]
struct OpeningHours {
    #[serde(default)]
    weekday_text: Vec<String>,
}

pub struct GoogleGeocoder {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl GoogleGeocoder {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, GeocodeError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`GeocodeError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("outletdb/0.1 (outlet-geocoding)")
            .build()?;

        // Exactly one trailing slash so the endpoint path is appended, not substituted.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| GeocodeError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
        })
    }

    /// Joins `path` onto the base URL and appends `params` followed by the key.
    fn build_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, GeocodeError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| GeocodeError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        {
            let mut query = url.query_pairs_mut();
            for (name, value) in params {
                query.append_pair(name, value);
            }
            query.append_pair("key", &self.api_key);
        }
        Ok(url)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        url: Url,
        context: &str,
    ) -> Result<T, GeocodeError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|source| GeocodeError::Deserialize {
            context: context.to_owned(),
            source,
        })
    }
}

/// Maps the shared non-success statuses of both endpoints.
fn status_error(status: String, message: Option<String>) -> GeocodeError {
    let message = message.unwrap_or_default();
    match status.as_str() {
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" | "UNKNOWN_ERROR" => {
            GeocodeError::Transient { status, message }
        }
        "REQUEST_DENIED" | "INVALID_REQUEST" => GeocodeError::Rejected { status, message },
        _ => GeocodeError::UnexpectedStatus(status),
    }
}

fn interpret(address: &str, response: GeocodeResponse) -> Result<GeocodeMatch, GeocodeError> {
    match response.status.as_str() {
        "OK" => response
            .results
            .into_iter()
            .next()
            .map(|r| GeocodeMatch {
                latitude: r.geometry.location.lat,
                longitude: r.geometry.location.lng,
                place_id: r.place_id.filter(|id| !id.is_empty()),
            })
            .ok_or_else(|| GeocodeError::NoMatch {
                address: address.to_owned(),
            }),
        "ZERO_RESULTS" => Err(GeocodeError::NoMatch {
            address: address.to_owned(),
        }),
        _ => Err(status_error(response.status, response.error_message)),
    }
}

fn interpret_details(response: PlaceDetailsResponse) -> Result<Vec<String>, GeocodeError> {
    match response.status.as_str() {
        "OK" => Ok(response
            .result
            .and_then(|r| r.opening_hours)
            .map(|h| h.weekday_text)
            .unwrap_or_default()),
        "ZERO_RESULTS" | "NOT_FOUND" => Ok(Vec::new()),
        _ => Err(status_error(response.status, response.error_message)),
    }
}

#[async_trait]
impl GeocodeService for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeocodeMatch, GeocodeError> {
        let url = self.build_url(GEOCODE_PATH, &[("address", address)])?;
        let response = self.request(url, "geocode response").await?;
        interpret(address, response)
    }

    async fn opening_hours(&self, place_id: &str) -> Result<Vec<String>, GeocodeError> {
        let url = self.build_url(
            PLACE_DETAILS_PATH,
            &[("place_id", place_id), ("fields", "opening_hours")],
        )?;
        let response = self.request(url, "place details response").await?;
        interpret_details(response)
    }
}
