//! Live integration tests for outletdb-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/outletdb-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use outletdb_core::{make_identity_key, GeocodeStatus, NewOutlet, RunSummary};
use outletdb_db::{
    complete_ingestion_run, count_outlets_awaiting_geocode, create_ingestion_run,
    fail_ingestion_run, get_ingestion_run, get_outlet, get_outlet_by_identity_key,
    identity_key_exists, insert_outlet, list_ingestion_runs, list_outlets_pending_geocode,
    outlet_stats, record_geocode_outcome, record_geocode_success, start_ingestion_run,
    CommitOutcome, DbError, OutletStore, PgOutletStore, RunType,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_outlet(name: &str, address: &str) -> NewOutlet {
    NewOutlet {
        identity_key: make_identity_key(name, address),
        name: name.to_string(),
        address: address.to_string(),
        telephone: Some("03-4251 4436".to_string()),
        facilities: vec!["Drive-Thru".to_string(), "24 Hours".to_string()],
        map_link: Some("https://waze.com/ul?q=test".to_string()),
    }
}

async fn insert(pool: &sqlx::PgPool, name: &str, address: &str) -> i64 {
    insert_outlet(pool, &new_outlet(name, address))
        .await
        .expect("insert_outlet failed")
        .expect("expected a fresh insert")
        .id
}

// ---------------------------------------------------------------------------
// Section 1: Outlets
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn insert_outlet_starts_pending_without_coordinates(pool: sqlx::PgPool) {
    let outlet = new_outlet("McD Ampang", "Jalan Ampang, Kuala Lumpur");
    let row = insert_outlet(&pool, &outlet)
        .await
        .expect("insert failed")
        .expect("row should be returned");

    assert_eq!(row.name, "McD Ampang");
    assert_eq!(row.waze_link.as_deref(), Some("https://waze.com/ul?q=test"));
    assert_eq!(row.telephone.as_deref(), Some("03-4251 4436"));
    assert_eq!(row.operating_hours, "");
    assert_eq!(row.geocode_status, "pending");
    assert!(row.latitude.is_none());
    assert!(row.longitude.is_none());
    assert!(identity_key_exists(&pool, &outlet.identity_key).await.unwrap());
}

#[sqlx::test(migrations = "../../migrations")]
async fn insert_outlet_duplicate_identity_returns_none(pool: sqlx::PgPool) {
    let outlet = new_outlet("McD Ampang", "Jalan Ampang");
    insert(&pool, "McD Ampang", "Jalan Ampang").await;

    let second = insert_outlet(&pool, &outlet).await.expect("insert failed");
    assert!(second.is_none(), "duplicate identity must not insert");

    let stats = outlet_stats(&pool).await.unwrap();
    assert_eq!(stats.total, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn record_geocode_success_sets_coordinates(pool: sqlx::PgPool) {
    let id = insert(&pool, "McD Ampang", "Jalan Ampang").await;

    record_geocode_success(&pool, id, 3.159, 101.713, "Monday: Open 24 hours")
        .await
        .expect("record_geocode_success failed");

    let row = get_outlet(&pool, id).await.unwrap();
    assert_eq!(row.geocode_status, "resolved");
    assert_eq!(row.latitude, Some(3.159));
    assert_eq!(row.longitude, Some(101.713));
    assert_eq!(row.operating_hours, "Monday: Open 24 hours");
    assert!(row.geocoded_at.is_some());
}

#[sqlx::test(migrations = "../../migrations")]
async fn record_geocode_success_missing_outlet_is_not_found(pool: sqlx::PgPool) {
    let err = record_geocode_success(&pool, 9_999, 1.0, 2.0, "")
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn failed_outlet_leaves_pending_list(pool: sqlx::PgPool) {
    let failed = insert(&pool, "McD Nowhere", "???").await;
    let deferred = insert(&pool, "McD Ampang", "Jalan Ampang").await;

    record_geocode_outcome(&pool, failed, GeocodeStatus::Failed, "no match")
        .await
        .unwrap();
    record_geocode_outcome(&pool, deferred, GeocodeStatus::Deferred, "rate limited")
        .await
        .unwrap();

    let pending = list_outlets_pending_geocode(&pool, 100).await.unwrap();
    let ids: Vec<i64> = pending.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![deferred]);
    assert_eq!(count_outlets_awaiting_geocode(&pool).await.unwrap(), 1);

    let failed_row = get_outlet(&pool, failed).await.unwrap();
    assert_eq!(failed_row.geocode_status, "failed");
    assert_eq!(failed_row.geocode_error.as_deref(), Some("no match"));
    assert!(failed_row.latitude.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn record_geocode_outcome_does_not_downgrade_resolved(pool: sqlx::PgPool) {
    let id = insert(&pool, "McD Ampang", "Jalan Ampang").await;
    record_geocode_success(&pool, id, 3.1, 101.7, "").await.unwrap();

    let err = record_geocode_outcome(&pool, id, GeocodeStatus::Deferred, "late")
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound));
    assert_eq!(get_outlet(&pool, id).await.unwrap().geocode_status, "resolved");
}

#[sqlx::test(migrations = "../../migrations")]
async fn record_geocode_outcome_rejects_resolved(pool: sqlx::PgPool) {
    let id = insert(&pool, "McD Ampang", "Jalan Ampang").await;
    let err = record_geocode_outcome(&pool, id, GeocodeStatus::Resolved, "")
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::ResolvedWithoutCoordinates { .. }));
}

#[sqlx::test(migrations = "../../migrations")]
async fn outlet_stats_groups_by_status(pool: sqlx::PgPool) {
    let a = insert(&pool, "A", "Address A").await;
    let b = insert(&pool, "B", "Address B").await;
    insert(&pool, "C", "Address C").await;

    record_geocode_success(&pool, a, 3.0, 101.0, "").await.unwrap();
    record_geocode_outcome(&pool, b, GeocodeStatus::Failed, "no match")
        .await
        .unwrap();

    let stats = outlet_stats(&pool).await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.resolved, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.deferred, 0);
    assert_eq!(stats.with_coordinates, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn get_outlet_by_identity_key_round_trip(pool: sqlx::PgPool) {
    let outlet = new_outlet("McD Ampang", "Jalan Ampang");
    insert(&pool, "McD Ampang", "Jalan Ampang").await;

    let found = get_outlet_by_identity_key(&pool, &outlet.identity_key)
        .await
        .unwrap()
        .expect("outlet should exist");
    assert_eq!(found.address, "Jalan Ampang");
    assert!(get_outlet_by_identity_key(&pool, "missing")
        .await
        .unwrap()
        .is_none());
}

// ---------------------------------------------------------------------------
// Section 2: PgOutletStore
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn store_commit_reports_duplicate(pool: sqlx::PgPool) {
    let store = PgOutletStore::new(pool);
    let outlet = new_outlet("McD Ampang", "Jalan Ampang");

    let first = store.commit(&outlet).await.unwrap();
    let CommitOutcome::Inserted(record) = first else {
        panic!("expected insert, got {first:?}");
    };
    assert_eq!(record.geocode_status, GeocodeStatus::Pending);
    assert_eq!(record.operating_hours, "");
    assert_eq!(record.telephone.as_deref(), Some("03-4251 4436"));
    assert_eq!(
        record.facilities,
        vec!["Drive-Thru".to_string(), "24 Hours".to_string()]
    );

    let second = store.commit(&outlet).await.unwrap();
    assert_eq!(second, CommitOutcome::Duplicate);
    assert!(store.identity_exists(&outlet.identity_key).await.unwrap());
}

#[sqlx::test(migrations = "../../migrations")]
async fn store_enrichment_removes_from_pending(pool: sqlx::PgPool) {
    let store = PgOutletStore::new(pool);
    let CommitOutcome::Inserted(record) = store
        .commit(&new_outlet("McD Ampang", "Jalan Ampang"))
        .await
        .unwrap()
    else {
        panic!("expected insert");
    };

    assert_eq!(store.list_pending_geocode(10).await.unwrap().len(), 1);
    store
        .commit_enrichment(record.id, 3.15, 101.71, "")
        .await
        .unwrap();
    assert!(store.list_pending_geocode(10).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Section 3: Ingestion Run Lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn ingestion_run_lifecycle_queued_to_succeeded(pool: sqlx::PgPool) {
    let run = create_ingestion_run(&pool, RunType::Ingest, Some("Kuala Lumpur"))
        .await
        .expect("create_ingestion_run failed");
    assert_eq!(run.status, "queued");
    assert_eq!(run.location_filter.as_deref(), Some("Kuala Lumpur"));

    start_ingestion_run(&pool, run.id).await.unwrap();

    let summary = RunSummary {
        pages_visited: 2,
        inserted: 3,
        skipped: 1,
        ..RunSummary::default()
    };
    complete_ingestion_run(&pool, run.id, &summary).await.unwrap();

    let fetched = get_ingestion_run(&pool, run.id).await.unwrap();
    assert_eq!(fetched.status, "succeeded");
    assert!(fetched.started_at.is_some());
    assert!(fetched.completed_at.is_some());
    assert_eq!(fetched.summary.map(|s| s.0), Some(summary));
}

#[sqlx::test(migrations = "../../migrations")]
async fn ingestion_run_rejects_double_start(pool: sqlx::PgPool) {
    let run = create_ingestion_run(&pool, RunType::Ingest, None)
        .await
        .unwrap();
    start_ingestion_run(&pool, run.id).await.unwrap();

    let err = start_ingestion_run(&pool, run.id).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidRunTransition {
            expected_status: "queued",
            ..
        }
    ));
}

#[sqlx::test(migrations = "../../migrations")]
async fn ingestion_run_fail_records_message(pool: sqlx::PgPool) {
    let run = create_ingestion_run(&pool, RunType::GeocodeSweep, None)
        .await
        .unwrap();
    start_ingestion_run(&pool, run.id).await.unwrap();
    fail_ingestion_run(&pool, run.id, "browser crashed")
        .await
        .unwrap();

    let fetched = get_ingestion_run(&pool, run.id).await.unwrap();
    assert_eq!(fetched.status, "failed");
    assert_eq!(fetched.error_message.as_deref(), Some("browser crashed"));

    let err = fail_ingestion_run(&pool, run.id, "again").await.unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidRunTransition {
            expected_status: "queued or running",
            ..
        }
    ));
}

#[sqlx::test(migrations = "../../migrations")]
async fn list_ingestion_runs_newest_first(pool: sqlx::PgPool) {
    let first = create_ingestion_run(&pool, RunType::Ingest, None)
        .await
        .unwrap();
    let second = create_ingestion_run(&pool, RunType::GeocodeSweep, None)
        .await
        .unwrap();

    let runs = list_ingestion_runs(&pool, 10).await.unwrap();
    let ids: Vec<i64> = runs.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}
