//! Read operations for the `outlets` table.

use sqlx::PgPool;

use super::types::{OutletRow, OutletStatsRow};
use crate::DbError;

/// Fetches a single outlet by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_outlet(pool: &PgPool, id: i64) -> Result<OutletRow, DbError> {
    sqlx::query_as::<_, OutletRow>(
        "SELECT id, identity_key, name, address, telephone, facilities, operating_hours, waze_link, \
                latitude, longitude, geocode_status, geocode_error, geocoded_at, created_at \
         FROM outlets \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Fetches the outlet stored under `identity_key`, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_outlet_by_identity_key(
    pool: &PgPool,
    identity_key: &str,
) -> Result<Option<OutletRow>, DbError> {
    let row = sqlx::query_as::<_, OutletRow>(
        "SELECT id, identity_key, name, address, telephone, facilities, operating_hours, waze_link, \
                latitude, longitude, geocode_status, geocode_error, geocoded_at, created_at \
         FROM outlets \
         WHERE identity_key = $1",
    )
    .bind(identity_key)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns `true` if an outlet with this identity key is already stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn identity_key_exists(pool: &PgPool, identity_key: &str) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM outlets WHERE identity_key = $1)",
    )
    .bind(identity_key)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Lists outlets still eligible for geocoding (`pending` or `deferred`),
/// oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_outlets_pending_geocode(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<OutletRow>, DbError> {
    let rows = sqlx::query_as::<_, OutletRow>(
        "SELECT id, identity_key, name, address, telephone, facilities, operating_hours, waze_link, \
                latitude, longitude, geocode_status, geocode_error, geocoded_at, created_at \
         FROM outlets \
         WHERE geocode_status IN ('pending', 'deferred') \
         ORDER BY id \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Counts outlets that still lack coordinates and may be retried.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_outlets_awaiting_geocode(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM outlets \
         WHERE latitude IS NULL \
           AND geocode_status IN ('pending', 'deferred')",
    )
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Returns outlet totals grouped by geocode status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn outlet_stats(pool: &PgPool) -> Result<OutletStatsRow, DbError> {
    let row = sqlx::query_as::<_, OutletStatsRow>(
        "SELECT \
            COUNT(*) AS total, \
            COUNT(*) FILTER (WHERE geocode_status = 'pending')  AS pending, \
            COUNT(*) FILTER (WHERE geocode_status = 'resolved') AS resolved, \
            COUNT(*) FILTER (WHERE geocode_status = 'deferred') AS deferred, \
            COUNT(*) FILTER (WHERE geocode_status = 'failed')   AS failed, \
            COUNT(*) FILTER (WHERE latitude IS NOT NULL AND longitude IS NOT NULL) \
                AS with_coordinates \
         FROM outlets",
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}
