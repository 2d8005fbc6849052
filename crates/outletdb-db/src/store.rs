//! The storage seam used by the ingestion pipeline.
//!
//! [`PgOutletStore`] is the production implementation; pipeline tests swap
//! in an in-memory store.

use async_trait::async_trait;
use outletdb_core::{GeocodeStatus, NewOutlet, OutletRecord};
use sqlx::PgPool;

use crate::outlets::{
    identity_key_exists, insert_outlet, list_outlets_pending_geocode, record_geocode_outcome,
    record_geocode_success, OutletRow,
};
use crate::DbError;

/// Result of committing a [`NewOutlet`].
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Inserted(OutletRecord),
    /// The identity key was taken between the duplicate check and the insert.
    Duplicate,
}

#[async_trait]
pub trait OutletStore: Send + Sync {
    async fn identity_exists(&self, identity_key: &str) -> Result<bool, DbError>;

    async fn commit(&self, outlet: &NewOutlet) -> Result<CommitOutcome, DbError>;

    /// Marks the outlet resolved. `operating_hours` may be empty when the
    /// service publishes none.
    async fn commit_enrichment(
        &self,
        id: i64,
        latitude: f64,
        longitude: f64,
        operating_hours: &str,
    ) -> Result<(), DbError>;

    async fn mark_geocode_outcome(
        &self,
        id: i64,
        status: GeocodeStatus,
        reason: &str,
    ) -> Result<(), DbError>;

    async fn list_pending_geocode(&self, limit: i64) -> Result<Vec<OutletRecord>, DbError>;
}

#[derive(Debug, Clone)]
pub struct PgOutletStore {
    pool: PgPool,
}

impl PgOutletStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutletStore for PgOutletStore {
    async fn identity_exists(&self, identity_key: &str) -> Result<bool, DbError> {
        identity_key_exists(&self.pool, identity_key).await
    }

    async fn commit(&self, outlet: &NewOutlet) -> Result<CommitOutcome, DbError> {
        match insert_outlet(&self.pool, outlet).await? {
            Some(row) => Ok(CommitOutcome::Inserted(row.into_record()?)),
            None => Ok(CommitOutcome::Duplicate),
        }
    }

    async fn commit_enrichment(
        &self,
        id: i64,
        latitude: f64,
        longitude: f64,
        operating_hours: &str,
    ) -> Result<(), DbError> {
        record_geocode_success(&self.pool, id, latitude, longitude, operating_hours).await
    }

    async fn mark_geocode_outcome(
        &self,
        id: i64,
        status: GeocodeStatus,
        reason: &str,
    ) -> Result<(), DbError> {
        record_geocode_outcome(&self.pool, id, status, reason).await
    }

    async fn list_pending_geocode(&self, limit: i64) -> Result<Vec<OutletRecord>, DbError> {
        list_outlets_pending_geocode(&self.pool, limit)
            .await?
            .into_iter()
            .map(OutletRow::into_record)
            .collect()
    }
}
