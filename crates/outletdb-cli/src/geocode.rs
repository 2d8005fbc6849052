//! The `geocode sweep` command and the enrichment step shared with `ingest`.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use outletdb_core::{AppConfig, GeocodeStatus, OutletRecord, RunSummary};
use outletdb_db::{DbError, OutletStore, PgOutletStore, RunType};
use outletdb_geocode::{EnrichResult, Enricher, EnricherConfig, GeocodeService, GoogleGeocoder};

use crate::{cancel_on_ctrl_c, fail_run_best_effort, print_summary};

/// Builds the production enricher.
///
/// # Errors
///
/// Returns an error if `GOOGLE_MAPS_API_KEY` is not configured or the HTTP
/// client cannot be built.
pub(crate) fn build_enricher(config: &AppConfig) -> anyhow::Result<Enricher<GoogleGeocoder>> {
    let api_key = config
        .google_maps_api_key
        .as_deref()
        .context("GOOGLE_MAPS_API_KEY is not set; geocoding is unavailable")?;
    let geocoder = GoogleGeocoder::new(api_key, config.geocode_timeout_secs)?;
    Ok(Enricher::new(geocoder, EnricherConfig::from_app_config(config)))
}

/// Geocodes `record` and writes the outcome back through `store`.
pub(crate) async fn enrich_and_record<St, G>(
    enricher: &Enricher<G>,
    store: &St,
    record: &OutletRecord,
    summary: &mut RunSummary,
) where
    St: OutletStore + ?Sized,
    G: GeocodeService,
{
    let written = match enricher.enrich(record).await {
        EnrichResult::Success {
            latitude,
            longitude,
            operating_hours,
        } => {
            let written = store
                .commit_enrichment(record.id, latitude, longitude, &operating_hours)
                .await;
            if written.is_ok() {
                summary.geocode_resolved += 1;
            }
            written
        }
        EnrichResult::Deferred(reason) => {
            summary.geocode_deferred += 1;
            store
                .mark_geocode_outcome(record.id, GeocodeStatus::Deferred, &reason)
                .await
        }
        EnrichResult::Failed(reason) => {
            summary.geocode_failed += 1;
            store
                .mark_geocode_outcome(record.id, GeocodeStatus::Failed, &reason)
                .await
        }
    };

    if let Err(e) = written {
        tracing::warn!(outlet_id = record.id, error = %e, "failed to record geocode outcome");
        summary.storage_errors += 1;
    }
}

/// Enriches up to `limit` outlets that still lack coordinates.
///
/// # Errors
///
/// Returns [`DbError`] only if the pending outlets cannot be listed.
pub(crate) async fn sweep<St, G>(
    store: &St,
    enricher: &Enricher<G>,
    limit: i64,
    cancel: &AtomicBool,
) -> Result<RunSummary, DbError>
where
    St: OutletStore + ?Sized,
    G: GeocodeService,
{
    let pending = store.list_pending_geocode(limit).await?;
    tracing::info!(outlets = pending.len(), "geocode sweep started");

    let mut summary = RunSummary::default();
    for record in &pending {
        if cancel.load(Ordering::SeqCst) {
            summary.cancelled = true;
            break;
        }
        enrich_and_record(enricher, store, record, &mut summary).await;
    }
    Ok(summary)
}

/// Runs the `geocode sweep` command.
///
/// # Errors
///
/// Returns an error if geocoding is not configured, `limit` is not positive,
/// or the run row or pending outlets cannot be read or written.
pub(crate) async fn run_geocode_sweep(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    limit: i64,
) -> anyhow::Result<()> {
    if limit <= 0 {
        anyhow::bail!("--limit must be positive");
    }
    let enricher = build_enricher(config)?;
    let cancel = cancel_on_ctrl_c();

    let run = outletdb_db::create_ingestion_run(pool, RunType::GeocodeSweep, None).await?;
    if let Err(e) = outletdb_db::start_ingestion_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, "geocode sweep", format!("{e:#}")).await;
        return Err(e.into());
    }

    let store = PgOutletStore::new(pool.clone());
    let summary = match sweep(&store, &enricher, limit, &cancel).await {
        Ok(summary) => summary,
        Err(e) => {
            fail_run_best_effort(pool, run.id, "geocode sweep", format!("{e:#}")).await;
            return Err(e.into());
        }
    };

    if let Err(e) = outletdb_db::complete_ingestion_run(pool, run.id, &summary).await {
        fail_run_best_effort(pool, run.id, "geocode sweep", format!("{e:#}")).await;
        return Err(e.into());
    }

    print_summary("geocode sweep", &summary);
    let remaining = outletdb_db::count_outlets_awaiting_geocode(pool).await?;
    println!("  still awaiting coordinates: {remaining}");
    tracing::info!(
        external_calls = enricher.external_calls(),
        remaining,
        "geocode sweep finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        app_config, new_outlet, stub_enricher, stub_enricher_with, MemoryStore, StubGeocoder,
    };

    #[test]
    fn enricher_requires_api_key() {
        let mut config = app_config();
        config.google_maps_api_key = None;
        let err = build_enricher(&config).err().expect("should fail");
        assert!(err.to_string().contains("GOOGLE_MAPS_API_KEY"));
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_resolves_pending_and_skips_failed() {
        let store = MemoryStore::default();
        for (name, address) in [("A", "Jalan A"), ("B", "???"), ("C", "Jalan C")] {
            store.commit(&new_outlet(name, address)).await.unwrap();
        }
        let enricher = stub_enricher();
        let cancel = AtomicBool::new(false);

        let first = sweep(&store, &enricher, 100, &cancel).await.unwrap();
        assert_eq!(first.geocode_resolved, 2);
        assert_eq!(first.geocode_failed, 1);
        assert_eq!(enricher.external_calls(), 3);

        let failed = store.by_name("B");
        assert_eq!(failed.geocode_status, GeocodeStatus::Failed);
        assert!(failed.latitude.is_none() && failed.longitude.is_none());

        // A fresh run finds nothing left to do and never re-queries "???".
        let next_run = stub_enricher();
        let second = sweep(&store, &next_run, 100, &cancel).await.unwrap();
        assert_eq!(second, RunSummary::default());
        assert_eq!(next_run.external_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn deferred_outlet_is_resolved_by_next_sweep() {
        let store = MemoryStore::default();
        store.commit(&new_outlet("A", "Jalan A")).await.unwrap();
        let cancel = AtomicBool::new(false);

        let throttled = stub_enricher_with(StubGeocoder::failing_transiently(1));
        let first = sweep(&store, &throttled, 100, &cancel).await.unwrap();
        assert_eq!(first.geocode_deferred, 1);
        assert_eq!(first.geocode_resolved, 0);
        let deferred = store.by_name("A");
        assert_eq!(deferred.geocode_status, GeocodeStatus::Deferred);
        assert!(deferred
            .geocode_error
            .as_deref()
            .is_some_and(|e| e.contains("OVER_QUERY_LIMIT")));
        assert!(deferred.latitude.is_none());

        let next_run = stub_enricher();
        let second = sweep(&store, &next_run, 100, &cancel).await.unwrap();
        assert_eq!(second.geocode_resolved, 1);
        assert_eq!(next_run.external_calls(), 1);
        let resolved = store.by_name("A");
        assert_eq!(resolved.geocode_status, GeocodeStatus::Resolved);
        assert_eq!(resolved.latitude, Some(3.139));
        assert_eq!(resolved.geocode_error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn resolved_outlet_stores_published_hours() {
        let store = MemoryStore::default();
        store.commit(&new_outlet("A", "Jalan A")).await.unwrap();

        let enricher = stub_enricher_with(StubGeocoder::with_hours(&["Monday: Open 24 hours"]));
        let summary = sweep(&store, &enricher, 10, &AtomicBool::new(false))
            .await
            .unwrap();
        assert_eq!(summary.geocode_resolved, 1);
        assert_eq!(enricher.external_calls(), 2);
        assert_eq!(store.by_name("A").operating_hours, "Monday: Open 24 hours");
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_respects_limit() {
        let store = MemoryStore::default();
        for i in 0..5 {
            store
                .commit(&new_outlet(&format!("Outlet {i}"), &format!("{i} Jalan")))
                .await
                .unwrap();
        }
        let enricher = stub_enricher();
        let summary = sweep(&store, &enricher, 2, &AtomicBool::new(false))
            .await
            .unwrap();
        assert_eq!(summary.geocode_resolved, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_sweep_stops_before_next_record() {
        let store = MemoryStore::default();
        store.commit(&new_outlet("A", "Jalan A")).await.unwrap();
        let enricher = stub_enricher();
        let summary = sweep(&store, &enricher, 10, &AtomicBool::new(true))
            .await
            .unwrap();
        assert!(summary.cancelled);
        assert_eq!(enricher.external_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_back_counts_as_storage_error() {
        let store = MemoryStore {
            fail_enrichment: true,
            ..MemoryStore::default()
        };
        store.commit(&new_outlet("A", "Jalan A")).await.unwrap();
        let enricher = stub_enricher();
        let summary = sweep(&store, &enricher, 10, &AtomicBool::new(false))
            .await
            .unwrap();
        assert_eq!(summary.geocode_resolved, 0);
        assert_eq!(summary.storage_errors, 1);
        assert_eq!(store.by_name("A").geocode_status, GeocodeStatus::Pending);
    }
}
