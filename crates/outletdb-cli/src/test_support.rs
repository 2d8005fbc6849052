//! Fakes shared by the command tests.

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use outletdb_core::{
    normalize_candidate, AppConfig, CandidateRecord, Environment, GeocodeStatus, NewOutlet,
    OutletRecord,
};
use outletdb_db::{CommitOutcome, DbError, OutletStore};
use outletdb_geocode::{Enricher, EnricherConfig, GeocodeError, GeocodeMatch, GeocodeService};

pub(crate) fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://localhost/outletdb_test".to_owned(),
        env: Environment::Test,
        log_level: "info".to_owned(),
        db_max_connections: 5,
        db_min_connections: 1,
        db_acquire_timeout_secs: 5,
        listing_url: "https://listing.test/locate-us".to_owned(),
        location_filter: "Kuala Lumpur".to_owned(),
        max_pages: 50,
        inter_page_delay_ms: 3000,
        page_load_attempts: 3,
        page_render_retries: 2,
        stable_poll_attempts: 10,
        stable_poll_interval_ms: 500,
        browser_timeout_secs: 30,
        chrome_executable: None,
        google_maps_api_key: Some("test-key".to_owned()),
        geocode_max_requests: 10,
        geocode_window_ms: 1000,
        geocode_timeout_secs: 10,
        geocode_max_retries: 2,
        geocode_retry_backoff_ms: 500,
        geocode_region_suffix: ", Malaysia".to_owned(),
    }
}

pub(crate) fn candidate(name: &str, address: &str) -> CandidateRecord {
    CandidateRecord {
        page: 1,
        name: name.to_owned(),
        address: address.to_owned(),
        telephone: None,
        facilities: Vec::new(),
        map_link: None,
    }
}

pub(crate) fn new_outlet(name: &str, address: &str) -> NewOutlet {
    normalize_candidate(&candidate(name, address)).expect("valid test outlet")
}

/// In-memory [`OutletStore`] with switchable failures.
#[derive(Default)]
pub(crate) struct MemoryStore {
    pub rows: Mutex<Vec<OutletRecord>>,
    pub next_id: AtomicI64,
    pub fail_lookups: bool,
    pub fail_enrichment: bool,
    /// Commits of outlets with this display name fail.
    pub fail_commit_for: Option<String>,
}

impl MemoryStore {
    pub(crate) fn records(&self) -> Vec<OutletRecord> {
        self.rows.lock().unwrap().clone()
    }

    pub(crate) fn by_name(&self, name: &str) -> OutletRecord {
        self.records()
            .into_iter()
            .find(|r| r.name == name)
            .unwrap_or_else(|| panic!("no outlet named {name}"))
    }

    fn update(&self, id: i64, f: impl FnOnce(&mut OutletRecord)) -> Result<(), DbError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.iter_mut().find(|r| r.id == id).ok_or(DbError::NotFound)?;
        f(row);
        Ok(())
    }
}

#[async_trait]
impl OutletStore for MemoryStore {
    async fn identity_exists(&self, identity_key: &str) -> Result<bool, DbError> {
        if self.fail_lookups {
            return Err(DbError::NotFound);
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.identity_key == identity_key))
    }

    async fn commit(&self, outlet: &NewOutlet) -> Result<CommitOutcome, DbError> {
        if self.fail_commit_for.as_deref() == Some(outlet.name.as_str()) {
            return Err(DbError::NotFound);
        }
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.identity_key == outlet.identity_key) {
            return Ok(CommitOutcome::Duplicate);
        }
        let record = OutletRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            identity_key: outlet.identity_key.clone(),
            name: outlet.name.clone(),
            address: outlet.address.clone(),
            telephone: outlet.telephone.clone(),
            facilities: outlet.facilities.clone(),
            operating_hours: String::new(),
            map_link: outlet.map_link.clone(),
            latitude: None,
            longitude: None,
            geocode_status: GeocodeStatus::Pending,
            geocode_error: None,
            geocoded_at: None,
            created_at: chrono::Utc::now(),
        };
        rows.push(record.clone());
        Ok(CommitOutcome::Inserted(record))
    }

    async fn commit_enrichment(
        &self,
        id: i64,
        latitude: f64,
        longitude: f64,
        operating_hours: &str,
    ) -> Result<(), DbError> {
        if self.fail_enrichment {
            return Err(DbError::NotFound);
        }
        self.update(id, |r| {
            r.latitude = Some(latitude);
            r.longitude = Some(longitude);
            r.operating_hours = operating_hours.to_owned();
            r.geocode_status = GeocodeStatus::Resolved;
            r.geocode_error = None;
            r.geocoded_at = Some(chrono::Utc::now());
        })
    }

    async fn mark_geocode_outcome(
        &self,
        id: i64,
        status: GeocodeStatus,
        reason: &str,
    ) -> Result<(), DbError> {
        self.update(id, |r| {
            r.geocode_status = status;
            r.geocode_error = Some(reason.to_owned());
            r.geocoded_at = Some(chrono::Utc::now());
        })
    }

    async fn list_pending_geocode(&self, limit: i64) -> Result<Vec<OutletRecord>, DbError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .records()
            .into_iter()
            .filter(|r| r.latitude.is_none() && r.geocode_status.is_retryable())
            .take(limit)
            .collect())
    }
}

/// Geocodes every address except ones starting with `???`. Calls are
/// counted by the wrapping [`Enricher`].
#[derive(Default)]
pub(crate) struct StubGeocoder {
    /// Leading geocode calls that answer `OVER_QUERY_LIMIT`.
    transient_failures: AtomicU32,
    /// When set, matches carry a place id and these hours are published.
    hours: Option<Vec<String>>,
}

impl StubGeocoder {
    pub(crate) fn failing_transiently(times: u32) -> Self {
        Self {
            transient_failures: AtomicU32::new(times),
            ..Self::default()
        }
    }

    pub(crate) fn with_hours(lines: &[&str]) -> Self {
        Self {
            hours: Some(lines.iter().map(|l| (*l).to_owned()).collect()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl GeocodeService for StubGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeocodeMatch, GeocodeError> {
        let throttled = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if throttled {
            return Err(GeocodeError::Transient {
                status: "OVER_QUERY_LIMIT".to_owned(),
                message: "You have exceeded your rate-limit for this API.".to_owned(),
            });
        }
        if address.starts_with("???") {
            return Err(GeocodeError::NoMatch {
                address: address.to_owned(),
            });
        }
        Ok(GeocodeMatch {
            latitude: 3.139,
            longitude: 101.687,
            place_id: self.hours.as_ref().map(|_| "stub-place".to_owned()),
        })
    }

    async fn opening_hours(&self, _place_id: &str) -> Result<Vec<String>, GeocodeError> {
        Ok(self.hours.clone().unwrap_or_default())
    }
}

pub(crate) fn stub_enricher() -> Enricher<StubGeocoder> {
    stub_enricher_with(StubGeocoder::default())
}

/// No retries, so every transient failure defers the outlet.
pub(crate) fn stub_enricher_with(geocoder: StubGeocoder) -> Enricher<StubGeocoder> {
    Enricher::new(
        geocoder,
        EnricherConfig {
            max_requests: 10,
            window: Duration::from_secs(1),
            max_retries: 0,
            retry_backoff_ms: 0,
            region_suffix: ", Malaysia".to_owned(),
        },
    )
}
