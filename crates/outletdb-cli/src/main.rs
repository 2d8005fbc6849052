mod geocode;
mod ingest;
mod outlets;

#[cfg(test)]
mod test_support;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "outletdb")]
#[command(about = "Outlet listing ingestion and geocoding")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database connectivity and schema management
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Scrape the outlet listing and store new outlets
    Ingest {
        /// Location filter to apply (defaults to OUTLETDB_LOCATION_FILTER)
        #[arg(long)]
        location: Option<String>,

        /// Override the page limit for this run
        #[arg(long)]
        max_pages: Option<u32>,

        /// Navigate and extract, print decisions, write nothing
        #[arg(long)]
        dry_run: bool,

        /// Store outlets without geocoding them; a later sweep picks them up
        #[arg(long)]
        skip_geocode: bool,
    },
    /// Coordinate enrichment
    Geocode {
        #[command(subcommand)]
        command: GeocodeCommands,
    },
    /// Read-only views over stored outlets
    Outlets {
        #[command(subcommand)]
        command: OutletsCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

#[derive(Debug, Subcommand)]
enum GeocodeCommands {
    /// Geocode every outlet still pending or deferred
    Sweep {
        /// Maximum number of outlets to process
        #[arg(long, default_value_t = 1000)]
        limit: i64,
    },
}

#[derive(Debug, Subcommand)]
enum OutletsCommands {
    /// Outlet counts by geocode status
    Stats,
    /// Most recent ingestion and sweep runs
    Runs {
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = outletdb_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = outletdb_db::PoolConfig::from_app_config(&config);
    let pool = outletdb_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            outletdb_db::ping(&pool).await?;
            println!("database reachable");
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = outletdb_db::run_migrations(&pool).await?;
            println!("migrations applied: {applied}");
        }
        Commands::Ingest {
            location,
            max_pages,
            dry_run,
            skip_geocode,
        } => {
            let args = ingest::IngestArgs {
                location,
                max_pages,
                dry_run,
                skip_geocode,
            };
            ingest::run_ingest(&pool, &config, args).await?;
        }
        Commands::Geocode {
            command: GeocodeCommands::Sweep { limit },
        } => geocode::run_geocode_sweep(&pool, &config, limit).await?,
        Commands::Outlets {
            command: OutletsCommands::Stats,
        } => outlets::run_outlet_stats(&pool).await?,
        Commands::Outlets {
            command: OutletsCommands::Runs { limit },
        } => outlets::run_list_runs(&pool, limit).await?,
    }

    Ok(())
}

/// Attempt to mark an ingestion run as failed, logging any secondary error.
async fn fail_run_best_effort(
    pool: &sqlx::PgPool,
    run_id: i64,
    context: &'static str,
    message: String,
) {
    if let Err(mark_err) = outletdb_db::fail_ingestion_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark {context} run as failed"
        );
    }
}

/// Sets the returned flag on the first Ctrl-C. Long-running loops check it
/// between pages and records.
fn cancel_on_ctrl_c() -> std::sync::Arc<std::sync::atomic::AtomicBool> {
    let flag = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let signal_flag = std::sync::Arc::clone(&flag);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("interrupt received; stopping at the next boundary");
                signal_flag.store(true, std::sync::atomic::Ordering::SeqCst);
            }
            Err(e) => tracing::warn!(error = %e, "failed to listen for ctrl-c"),
        }
    });
    flag
}

fn print_summary(label: &str, summary: &outletdb_core::RunSummary) {
    tracing::info!(
        run = label,
        pages = summary.pages_visited,
        inserted = summary.inserted,
        skipped = summary.skipped,
        rejected = summary.rejected,
        extraction_warnings = summary.extraction_warnings,
        storage_errors = summary.storage_errors,
        geocode_resolved = summary.geocode_resolved,
        geocode_deferred = summary.geocode_deferred,
        geocode_failed = summary.geocode_failed,
        cancelled = summary.cancelled,
        "run finished"
    );
    println!("{label} summary:");
    println!("  pages visited:       {}", summary.pages_visited);
    println!("  inserted:            {}", summary.inserted);
    println!("  skipped (duplicate): {}", summary.skipped);
    println!("  rejected:            {}", summary.rejected);
    println!("  extraction warnings: {}", summary.extraction_warnings);
    println!("  storage errors:      {}", summary.storage_errors);
    println!("  geocode resolved:    {}", summary.geocode_resolved);
    println!("  geocode deferred:    {}", summary.geocode_deferred);
    println!("  geocode failed:      {}", summary.geocode_failed);
    if summary.cancelled {
        println!("  (interrupted before completion)");
    }
}
