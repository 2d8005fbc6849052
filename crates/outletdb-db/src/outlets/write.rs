//! Write operations for the `outlets` table.
//!
//! Every write runs in its own transaction so a failure leaves no partial
//! row behind and the caller can move on to the next record.

use outletdb_core::{GeocodeStatus, NewOutlet};
use sqlx::PgPool;

use super::types::OutletRow;
use crate::DbError;

/// Inserts a new outlet with coordinates unset and status `pending`.
///
/// Returns `None` when another row already holds the same identity key
/// (`ON CONFLICT (identity_key) DO NOTHING`), so a concurrent writer shows
/// up as a duplicate rather than an error.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert or commit fails. The transaction
/// is rolled back on drop.
pub async fn insert_outlet(pool: &PgPool, outlet: &NewOutlet) -> Result<Option<OutletRow>, DbError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, OutletRow>(
        "INSERT INTO outlets (identity_key, name, address, telephone, facilities, waze_link) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (identity_key) DO NOTHING \
         RETURNING id, identity_key, name, address, telephone, facilities, operating_hours, waze_link, \
                   latitude, longitude, geocode_status, geocode_error, geocoded_at, created_at",
    )
    .bind(&outlet.identity_key)
    .bind(&outlet.name)
    .bind(&outlet.address)
    .bind(outlet.telephone.as_deref())
    .bind(&outlet.facilities)
    .bind(outlet.map_link.as_deref())
    .fetch_optional(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

/// Stores resolved coordinates and published hours, and marks the outlet
/// `resolved`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the outlet does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn record_geocode_success(
    pool: &PgPool,
    id: i64,
    latitude: f64,
    longitude: f64,
    operating_hours: &str,
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE outlets \
         SET latitude = $1, longitude = $2, operating_hours = $3, geocode_status = 'resolved', \
             geocode_error = NULL, geocoded_at = NOW(), updated_at = NOW() \
         WHERE id = $4",
    )
    .bind(latitude)
    .bind(longitude)
    .bind(operating_hours)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    tx.commit().await?;
    Ok(())
}

/// Records a non-success geocode outcome. Coordinates are left untouched.
///
/// Rows that already hold coordinates are not downgraded.
///
/// # Errors
///
/// Returns [`DbError::ResolvedWithoutCoordinates`] when called with
/// [`GeocodeStatus::Resolved`], [`DbError::NotFound`] if no coordinate-less
/// outlet has this `id`, or [`DbError::Sqlx`] if the update fails.
pub async fn record_geocode_outcome(
    pool: &PgPool,
    id: i64,
    status: GeocodeStatus,
    reason: &str,
) -> Result<(), DbError> {
    if status == GeocodeStatus::Resolved {
        return Err(DbError::ResolvedWithoutCoordinates { id });
    }

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE outlets \
         SET geocode_status = $1, geocode_error = $2, geocoded_at = NOW(), updated_at = NOW() \
         WHERE id = $3 AND latitude IS NULL",
    )
    .bind(status.as_str())
    .bind(reason)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    tx.commit().await?;
    Ok(())
}
