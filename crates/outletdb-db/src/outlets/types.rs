//! Row types for the `outlets` table.

use chrono::{DateTime, Utc};
use outletdb_core::{GeocodeStatus, OutletRecord};

use crate::DbError;

/// A row from the `outlets` table.
///
/// The map link lives in the `waze_link` column.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OutletRow {
    pub id: i64,
    pub identity_key: String,
    pub name: String,
    pub address: String,
    pub telephone: Option<String>,
    pub facilities: Vec<String>,
    pub operating_hours: String,
    pub waze_link: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geocode_status: String,
    pub geocode_error: Option<String>,
    pub geocoded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OutletRow {
    /// Converts the row into the shared domain type.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidGeocodeStatus`] if `geocode_status` holds a
    /// value outside the known set.
    pub fn into_record(self) -> Result<OutletRecord, DbError> {
        let geocode_status = GeocodeStatus::parse(&self.geocode_status).ok_or_else(|| {
            DbError::InvalidGeocodeStatus {
                id: self.id,
                value: self.geocode_status.clone(),
            }
        })?;

        Ok(OutletRecord {
            id: self.id,
            identity_key: self.identity_key,
            name: self.name,
            address: self.address,
            telephone: self.telephone,
            facilities: self.facilities,
            operating_hours: self.operating_hours,
            map_link: self.waze_link,
            latitude: self.latitude,
            longitude: self.longitude,
            geocode_status,
            geocode_error: self.geocode_error,
            geocoded_at: self.geocoded_at,
            created_at: self.created_at,
        })
    }
}

/// Outlet totals grouped by geocode status.
#[derive(Debug, Clone, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct OutletStatsRow {
    pub total: i64,
    pub pending: i64,
    pub resolved: i64,
    pub deferred: i64,
    pub failed: i64,
    /// Rows with both coordinates set.
    pub with_coordinates: i64,
}
