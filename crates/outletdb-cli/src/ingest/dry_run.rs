//! A store that answers duplicate checks from the database but writes nothing.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use outletdb_core::{GeocodeStatus, NewOutlet, OutletRecord};
use outletdb_db::{CommitOutcome, DbError, OutletStore};

/// Wraps a real store for `ingest --dry-run`. Keys "committed" during the run
/// are remembered so in-run duplicates are still reported as skips.
pub(crate) struct DryRunStore<St> {
    inner: St,
    seen: Mutex<HashSet<String>>,
    next_id: AtomicI64,
}

impl<St> DryRunStore<St> {
    pub(crate) fn new(inner: St) -> Self {
        Self {
            inner,
            seen: Mutex::new(HashSet::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn seen(&self, identity_key: &str) -> bool {
        self.seen
            .lock()
            .map(|seen| seen.contains(identity_key))
            .unwrap_or(false)
    }
}

#[async_trait]
impl<St: OutletStore> OutletStore for DryRunStore<St> {
    async fn identity_exists(&self, identity_key: &str) -> Result<bool, DbError> {
        if self.seen(identity_key) {
            return Ok(true);
        }
        self.inner.identity_exists(identity_key).await
    }

    async fn commit(&self, outlet: &NewOutlet) -> Result<CommitOutcome, DbError> {
        let newly_seen = self
            .seen
            .lock()
            .map(|mut seen| seen.insert(outlet.identity_key.clone()))
            .unwrap_or(true);
        if !newly_seen {
            return Ok(CommitOutcome::Duplicate);
        }
        println!("would insert: {} | {}", outlet.name, outlet.address);
        Ok(CommitOutcome::Inserted(OutletRecord {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
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
        }))
    }

    async fn commit_enrichment(
        &self,
        _id: i64,
        _lat: f64,
        _lon: f64,
        _hours: &str,
    ) -> Result<(), DbError> {
        Ok(())
    }

    async fn mark_geocode_outcome(
        &self,
        _id: i64,
        _status: GeocodeStatus,
        _reason: &str,
    ) -> Result<(), DbError> {
        Ok(())
    }

    async fn list_pending_geocode(&self, _limit: i64) -> Result<Vec<OutletRecord>, DbError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{new_outlet, MemoryStore};

    #[tokio::test]
    async fn writes_nothing_to_the_inner_store() {
        let inner = MemoryStore::default();
        let store = DryRunStore::new(inner);
        let outlet = new_outlet("Outlet A", "Jalan A");

        assert!(!store.identity_exists(&outlet.identity_key).await.unwrap());
        assert!(matches!(
            store.commit(&outlet).await.unwrap(),
            CommitOutcome::Inserted(_)
        ));
        assert!(store.identity_exists(&outlet.identity_key).await.unwrap());
        assert!(matches!(
            store.commit(&outlet).await.unwrap(),
            CommitOutcome::Duplicate
        ));
        assert!(store.inner.records().is_empty());
    }

    #[tokio::test]
    async fn existing_rows_are_reported_as_duplicates() {
        let inner = MemoryStore::default();
        let outlet = new_outlet("Outlet A", "Jalan A");
        inner.commit(&outlet).await.unwrap();

        let store = DryRunStore::new(inner);
        assert!(store.identity_exists(&outlet.identity_key).await.unwrap());
    }
}
