//! Page → candidates → decisions → store → enrichment, sequential per record.

use std::sync::atomic::{AtomicBool, Ordering};

use outletdb_core::{CandidateRecord, Decision, RunSummary};
use outletdb_db::{CommitOutcome, OutletStore};
use outletdb_geocode::{Enricher, GeocodeService};
use outletdb_scraper::{ListingSession, Navigator, PanelExtractor};

use super::decide::process;
use crate::geocode::enrich_and_record;

fn saturating_count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Drains `navigator`, committing every accepted candidate to `store`.
///
/// Storage failures are counted and logged, never fatal. When `enricher` is
/// set each newly inserted outlet is geocoded before the next candidate. The
/// navigator is closed before returning, including on cancellation.
pub(crate) async fn run_pipeline<S, St, G>(
    navigator: &mut Navigator<S>,
    extractor: &PanelExtractor,
    store: &St,
    enricher: Option<&Enricher<G>>,
    cancel: &AtomicBool,
) -> RunSummary
where
    S: ListingSession,
    St: OutletStore + ?Sized,
    G: GeocodeService,
{
    let mut summary = RunSummary::default();

    'pages: loop {
        if cancel.load(Ordering::SeqCst) {
            summary.cancelled = true;
            break;
        }
        let Some(page) = navigator.next_page().await else {
            break;
        };
        summary.pages_visited += 1;

        let extraction = extractor.extract(&page);
        summary.extraction_warnings = summary
            .extraction_warnings
            .saturating_add(saturating_count(extraction.warnings.len()));

        for candidate in &extraction.candidates {
            if cancel.load(Ordering::SeqCst) {
                summary.cancelled = true;
                break 'pages;
            }
            ingest_candidate(candidate, store, enricher, &mut summary).await;
        }
    }

    navigator.close().await;
    summary
}

async fn ingest_candidate<St, G>(
    candidate: &CandidateRecord,
    store: &St,
    enricher: Option<&Enricher<G>>,
    summary: &mut RunSummary,
) where
    St: OutletStore + ?Sized,
    G: GeocodeService,
{
    let decision = match process(candidate, store).await {
        Ok(decision) => decision,
        Err(e) => {
            tracing::warn!(
                page = candidate.page,
                outlet = %candidate.name,
                error = %e,
                "duplicate check failed; skipping candidate"
            );
            summary.storage_errors += 1;
            return;
        }
    };

    let outlet = match decision {
        Decision::Insert(outlet) => outlet,
        Decision::Skip(reason) => {
            tracing::debug!(page = candidate.page, outlet = %candidate.name, %reason, "skipped");
            summary.skipped += 1;
            return;
        }
        Decision::Reject(reason) => {
            tracing::info!(page = candidate.page, outlet = %candidate.name, %reason, "rejected");
            summary.rejected += 1;
            return;
        }
    };

    let record = match store.commit(&outlet).await {
        Ok(CommitOutcome::Inserted(record)) => record,
        Ok(CommitOutcome::Duplicate) => {
            tracing::debug!(identity_key = %outlet.identity_key, "lost insert race; skipped");
            summary.skipped += 1;
            return;
        }
        Err(e) => {
            tracing::warn!(
                outlet = %outlet.name,
                identity_key = %outlet.identity_key,
                error = %e,
                "failed to store outlet"
            );
            summary.storage_errors += 1;
            return;
        }
    };

    tracing::info!(outlet_id = record.id, outlet = %record.name, "outlet stored");
    summary.inserted += 1;

    if let Some(enricher) = enricher {
        enrich_and_record(enricher, store, &record, summary).await;
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
