//! Offline tests for outletdb-db pool configuration and row types.
//! These tests do not require a live database connection.

use outletdb_core::{AppConfig, Environment, RunSummary};
use outletdb_db::{IngestionRunRow, PoolConfig, RunType};

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        listing_url: "https://example.test/locate-us".to_string(),
        location_filter: "Kuala Lumpur".to_string(),
        max_pages: 5,
        inter_page_delay_ms: 0,
        page_load_attempts: 1,
        page_render_retries: 0,
        stable_poll_attempts: 1,
        stable_poll_interval_ms: 0,
        browser_timeout_secs: 5,
        chrome_executable: None,
        google_maps_api_key: None,
        geocode_max_requests: 10,
        geocode_window_ms: 1000,
        geocode_timeout_secs: 5,
        geocode_max_retries: 0,
        geocode_retry_backoff_ms: 0,
        geocode_region_suffix: ", Malaysia".to_string(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn run_type_column_values() {
    assert_eq!(RunType::Ingest.as_str(), "ingest");
    assert_eq!(RunType::GeocodeSweep.as_str(), "geocode_sweep");
}

/// Compile-time smoke test: confirm that [`IngestionRunRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn ingestion_run_row_has_expected_fields() {
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    let row = IngestionRunRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        run_type: "ingest".to_string(),
        location_filter: Some("Kuala Lumpur".to_string()),
        status: "queued".to_string(),
        summary: Some(Json(RunSummary::default())),
        error_message: None,
        started_at: None,
        completed_at: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.run_type, "ingest");
    assert_eq!(row.status, "queued");
    assert_eq!(row.summary.map(|s| s.0.inserted), Some(0));
}
