//! Read-only `outlets` subcommands.

/// Prints outlet totals by geocode status.
///
/// # Errors
///
/// Returns an error if the stats query fails.
pub(crate) async fn run_outlet_stats(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let stats = outletdb_db::outlet_stats(pool).await?;
    println!("outlets:          {}", stats.total);
    println!("  pending:        {}", stats.pending);
    println!("  resolved:       {}", stats.resolved);
    println!("  deferred:       {}", stats.deferred);
    println!("  failed:         {}", stats.failed);
    println!("with coordinates: {}", stats.with_coordinates);
    Ok(())
}

/// Prints the most recent runs, newest first.
///
/// # Errors
///
/// Returns an error if the runs cannot be listed.
pub(crate) async fn run_list_runs(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    if limit <= 0 {
        anyhow::bail!("--limit must be positive");
    }
    let runs = outletdb_db::list_ingestion_runs(pool, limit).await?;
    if runs.is_empty() {
        println!("no runs recorded");
        return Ok(());
    }

    println!("| id | type | location | status | inserted | skipped | rejected | started |");
    println!("|---|---|---|---|---|---|---|---|");
    for run in &runs {
        let location = run.location_filter.as_deref().unwrap_or("-");
        let started = run
            .started_at
            .map_or_else(|| "-".to_owned(), |t| t.format("%Y-%m-%d %H:%M").to_string());
        let (inserted, skipped, rejected) = run
            .summary
            .as_ref()
            .map_or((0, 0, 0), |s| (s.0.inserted, s.0.skipped, s.0.rejected));
        println!(
            "| {} | {} | {location} | {} | {inserted} | {skipped} | {rejected} | {started} |",
            run.id, run.run_type, run.status
        );
        if let Some(message) = &run.error_message {
            println!("|   | error: {message} | | | | | | |");
        }
    }
    Ok(())
}
