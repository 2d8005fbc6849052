//! Shared outlet domain types passed between the scraper, geocoder, store
//! and the CLI orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw field strings pulled from one result panel. Nothing is cleaned yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    /// 1-based index of the listing page the panel was found on.
    pub page: u32,
    pub name: String,
    pub address: String,
    pub telephone: Option<String>,
    /// Facility badge labels in page order, e.g. `"Drive-Thru"`.
    pub facilities: Vec<String>,
    pub map_link: Option<String>,
}

/// A validated outlet ready to be committed. Coordinates are always unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOutlet {
    pub identity_key: String,
    pub name: String,
    pub address: String,
    pub telephone: Option<String>,
    pub facilities: Vec<String>,
    pub map_link: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeocodeStatus {
    Pending,
    Resolved,
    Deferred,
    Failed,
}

impl GeocodeStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            GeocodeStatus::Pending => "pending",
            GeocodeStatus::Resolved => "resolved",
            GeocodeStatus::Deferred => "deferred",
            GeocodeStatus::Failed => "failed",
        }
    }

    /// Parses the lowercase column value stored in `outlets.geocode_status`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(GeocodeStatus::Pending),
            "resolved" => Some(GeocodeStatus::Resolved),
            "deferred" => Some(GeocodeStatus::Deferred),
            "failed" => Some(GeocodeStatus::Failed),
            _ => None,
        }
    }

    /// Whether a sweep should still try to resolve a row in this state.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, GeocodeStatus::Pending | GeocodeStatus::Deferred)
    }
}

impl std::fmt::Display for GeocodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted outlet.
///
/// `latitude`/`longitude` of `None` means "not yet enriched"; a lookup that
/// found nothing is recorded as [`GeocodeStatus::Failed`] instead.
/// `operating_hours` stays empty until enrichment finds published hours.
#[derive(Debug, Clone, PartialEq)]
pub struct OutletRecord {
    pub id: i64,
    pub identity_key: String,
    pub name: String,
    pub address: String,
    pub telephone: Option<String>,
    pub facilities: Vec<String>,
    pub operating_hours: String,
    pub map_link: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geocode_status: GeocodeStatus,
    pub geocode_error: Option<String>,
    pub geocoded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    DuplicateIdentity { identity_key: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::DuplicateIdentity { identity_key } => {
                write!(f, "duplicate identity {identity_key}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmptyName,
    EmptyAddress,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::EmptyName => write!(f, "name is empty after normalization"),
            RejectReason::EmptyAddress => write!(f, "address is empty after normalization"),
        }
    }
}

/// Outcome of running one candidate through normalization and the
/// duplicate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Insert(NewOutlet),
    Skip(SkipReason),
    Reject(RejectReason),
}

/// Counters describing one ingestion run. Persisted as JSON on the run row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub pages_visited: u32,
    pub inserted: u32,
    pub skipped: u32,
    pub rejected: u32,
    pub extraction_warnings: u32,
    pub storage_errors: u32,
    pub geocode_resolved: u32,
    pub geocode_deferred: u32,
    pub geocode_failed: u32,
    /// True when the run stopped early on an interrupt.
    #[serde(default)]
    pub cancelled: bool,
}
