//! Address-to-coordinate enrichment for stored outlets.
//!
//! An [`Enricher`] lives for one run. It owns the rate limiter and a cache
//! keyed by the folded address. Concurrent lookups of the same address share
//! one in-flight request. Only definitive answers (a match or no match) are
//! cached; transient failures are retried by later calls.
//!
//! A match that carries a place id is followed by a Place Details request for
//! opening hours. That request goes through the same limiter and retry policy
//! but is best-effort: if it fails the outlet still resolves, with no hours.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use outletdb_core::text::{clean_display_text, fold_key};
use outletdb_core::{AppConfig, OutletRecord};
use tokio::sync::{Mutex, OnceCell};

use crate::client::GeocodeService;
use crate::error::GeocodeError;
use crate::limiter::WindowRateLimiter;
use crate::retry::retry_with_backoff;

#[derive(Debug, Clone)]
pub struct EnricherConfig {
    pub max_requests: u32,
    pub window: Duration,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    /// Appended to every address before lookup, e.g. `", Malaysia"`.
    pub region_suffix: String,
}

impl EnricherConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_requests: config.geocode_max_requests,
            window: Duration::from_millis(config.geocode_window_ms),
            max_retries: config.geocode_max_retries,
            retry_backoff_ms: config.geocode_retry_backoff_ms,
            region_suffix: config.geocode_region_suffix.clone(),
        }
    }
}

/// Weekday lines are stored as one string joined by this separator.
pub const HOURS_SEPARATOR: &str = "; ";

/// Outcome of enriching one outlet.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichResult {
    Success {
        latitude: f64,
        longitude: f64,
        /// Empty when no hours are published or they could not be fetched.
        operating_hours: String,
    },
    /// Worth retrying in a later sweep.
    Deferred(String),
    /// The address cannot be geocoded.
    Failed(String),
}

#[derive(Debug, Clone)]
enum Resolution {
    Found {
        latitude: f64,
        longitude: f64,
        operating_hours: String,
    },
    NoMatch,
}

pub struct Enricher<G> {
    service: G,
    limiter: WindowRateLimiter,
    config: EnricherConfig,
    cache: Mutex<HashMap<String, Arc<OnceCell<Resolution>>>>,
    external_calls: AtomicUsize,
}

impl<G: GeocodeService> Enricher<G> {
    #[must_use]
    pub fn new(service: G, config: EnricherConfig) -> Self {
        Self {
            service,
            limiter: WindowRateLimiter::new(config.max_requests, config.window),
            config,
            cache: Mutex::new(HashMap::new()),
            external_calls: AtomicUsize::new(0),
        }
    }

    /// Number of requests sent to the geocoding service so far, retries included.
    #[must_use]
    pub fn external_calls(&self) -> usize {
        self.external_calls.load(Ordering::Relaxed)
    }

    /// Never fails; every error is folded into [`EnrichResult`].
    pub async fn enrich(&self, outlet: &OutletRecord) -> EnrichResult {
        let result = self.enrich_address(&outlet.address).await;
        match &result {
            EnrichResult::Success { .. } => {
                tracing::debug!(outlet_id = outlet.id, "outlet geocoded");
            }
            EnrichResult::Deferred(reason) => {
                tracing::warn!(outlet_id = outlet.id, reason = %reason, "geocoding deferred");
            }
            EnrichResult::Failed(reason) => {
                tracing::warn!(outlet_id = outlet.id, reason = %reason, "geocoding failed");
            }
        }
        result
    }

    pub async fn enrich_address(&self, address: &str) -> EnrichResult {
        let display = clean_display_text(address);
        let key = fold_key(&display);
        if key.is_empty() {
            return EnrichResult::Failed("address is empty".to_owned());
        }

        let cell = {
            let mut cache = self.cache.lock().await;
            Arc::clone(cache.entry(key).or_default())
        };

        let query = format!("{display}{}", self.config.region_suffix);
        match cell.get_or_try_init(|| self.resolve(&query)).await {
            Ok(Resolution::Found {
                latitude,
                longitude,
                operating_hours,
            }) => EnrichResult::Success {
                latitude: *latitude,
                longitude: *longitude,
                operating_hours: operating_hours.clone(),
            },
            Ok(Resolution::NoMatch) => {
                EnrichResult::Failed(format!("no geocoding match for '{display}'"))
            }
            Err(e) => EnrichResult::Deferred(e.to_string()),
        }
    }

    async fn resolve(&self, query: &str) -> Result<Resolution, GeocodeError> {
        let service = &self.service;
        match self.limited(move || service.geocode(query)).await {
            Ok(found) => {
                let operating_hours = match found.place_id.as_deref() {
                    Some(place_id) => self.opening_hours(place_id).await,
                    None => String::new(),
                };
                Ok(Resolution::Found {
                    latitude: found.latitude,
                    longitude: found.longitude,
                    operating_hours,
                })
            }
            Err(GeocodeError::NoMatch { .. }) => Ok(Resolution::NoMatch),
            Err(e) => Err(e),
        }
    }

    async fn opening_hours(&self, place_id: &str) -> String {
        let service = &self.service;
        match self.limited(move || service.opening_hours(place_id)).await {
            Ok(lines) => lines
                .iter()
                .map(String::as_str)
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join(HOURS_SEPARATOR),
            Err(e) => {
                tracing::warn!(place_id, error = %e, "opening hours lookup failed");
                String::new()
            }
        }
    }

    /// Sends one logical request through the limiter, retrying transient
    /// errors. Every attempt counts as an external call.
    async fn limited<T, F, Fut>(&self, request: F) -> Result<T, GeocodeError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, GeocodeError>>,
    {
        let limiter = &self.limiter;
        let calls = &self.external_calls;
        let request = &request;
        retry_with_backoff(
            self.config.max_retries,
            self.config.retry_backoff_ms,
            move || async move {
                limiter.acquire().await;
                calls.fetch_add(1, Ordering::Relaxed);
                request().await
            },
        )
        .await
    }
}

#[cfg(test)]
#[path = "enricher_test.rs"]
mod tests;
