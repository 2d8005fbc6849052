//! The `ingest` command.
//!
//! Acquires the browser session and run row, drives the pipeline, and records
//! the summary. Only resource acquisition failures abort the command; per-page
//! and per-record problems are counted in the summary.

mod decide;
mod dry_run;
mod pipeline;

use pipeline::run_pipeline;

use anyhow::Context;
use outletdb_core::AppConfig;
use outletdb_db::{PgOutletStore, RunType};
use outletdb_geocode::{Enricher, GoogleGeocoder};
use outletdb_scraper::{
    ChromiumSession, ChromiumSessionConfig, Navigator, NavigatorConfig, PanelExtractor,
    PanelSelectors,
};

use crate::{cancel_on_ctrl_c, fail_run_best_effort, print_summary};

#[derive(Debug, Clone)]
pub(crate) struct IngestArgs {
    pub location: Option<String>,
    pub max_pages: Option<u32>,
    pub dry_run: bool,
    pub skip_geocode: bool,
}

fn navigator_config(config: &AppConfig, max_pages: Option<u32>) -> anyhow::Result<NavigatorConfig> {
    let mut nav = NavigatorConfig::from_app_config(config);
    if let Some(max_pages) = max_pages {
        if max_pages == 0 {
            anyhow::bail!("--max-pages must be at least 1");
        }
        nav.max_pages = max_pages;
    }
    Ok(nav)
}

fn resolve_location(config: &AppConfig, location: Option<&str>) -> anyhow::Result<String> {
    let location = location.unwrap_or(&config.location_filter).trim();
    if location.is_empty() {
        anyhow::bail!("location filter must not be empty");
    }
    Ok(location.to_owned())
}

/// `None` when geocoding is switched off or no API key is configured.
fn inline_enricher(
    config: &AppConfig,
    skip_geocode: bool,
) -> anyhow::Result<Option<Enricher<GoogleGeocoder>>> {
    if skip_geocode {
        return Ok(None);
    }
    if config.google_maps_api_key.is_none() {
        tracing::warn!(
            "GOOGLE_MAPS_API_KEY is not set; outlets will be stored pending geocoding"
        );
        return Ok(None);
    }
    crate::geocode::build_enricher(config).map(Some)
}

async fn start_navigator(
    config: &AppConfig,
    nav_config: NavigatorConfig,
    selectors: &PanelSelectors,
    location: &str,
) -> anyhow::Result<Navigator<ChromiumSession>> {
    let session = ChromiumSession::launch(ChromiumSessionConfig::from_app_config(config, selectors))
        .await
        .context("failed to launch headless browser")?;
    let navigator = Navigator::start(session, nav_config, location).await?;
    Ok(navigator)
}

/// Runs one ingestion.
///
/// # Errors
///
/// Returns an error if the browser cannot be launched, the listing cannot be
/// loaded or filtered, or the run row cannot be created or completed.
pub(crate) async fn run_ingest(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    args: IngestArgs,
) -> anyhow::Result<()> {
    let location = resolve_location(config, args.location.as_deref())?;
    let nav_config = navigator_config(config, args.max_pages)?;
    let selectors = PanelSelectors::default();
    let extractor = PanelExtractor::new(&selectors)?;
    let cancel = cancel_on_ctrl_c();

    if args.dry_run {
        let mut navigator = start_navigator(config, nav_config, &selectors, &location).await?;
        let store = dry_run::DryRunStore::new(PgOutletStore::new(pool.clone()));
        let summary = run_pipeline::<_, _, GoogleGeocoder>(
            &mut navigator,
            &extractor,
            &store,
            None,
            &cancel,
        )
        .await;
        println!("dry-run: nothing was written");
        print_summary("dry-run ingest", &summary);
        return Ok(());
    }

    let enricher = inline_enricher(config, args.skip_geocode)?;

    let run = outletdb_db::create_ingestion_run(pool, RunType::Ingest, Some(&location)).await?;
    if let Err(e) = outletdb_db::start_ingestion_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, "ingest", format!("{e:#}")).await;
        return Err(e.into());
    }
    tracing::info!(
        run_id = run.id,
        public_id = %run.public_id,
        location = %location,
        "ingestion run started"
    );

    let mut navigator = match start_navigator(config, nav_config, &selectors, &location).await {
        Ok(navigator) => navigator,
        Err(e) => {
            fail_run_best_effort(pool, run.id, "ingest", format!("{e:#}")).await;
            return Err(e);
        }
    };

    let store = PgOutletStore::new(pool.clone());
    let summary = run_pipeline(
        &mut navigator,
        &extractor,
        &store,
        enricher.as_ref(),
        &cancel,
    )
    .await;

    if let Err(e) = outletdb_db::complete_ingestion_run(pool, run.id, &summary).await {
        tracing::error!(run_id = run.id, error = %e, "failed to record run summary");
        fail_run_best_effort(pool, run.id, "ingest", format!("{e:#}")).await;
        return Err(e.into());
    }

    print_summary("ingest", &summary);
    Ok(())
}
