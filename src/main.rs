//! Catalog-Harvest main entry point
//!
//! This is the command-line interface for the catalog crawler and its read API.

use anyhow::{bail, Context};
use catalog_harvest::config::{load_config_with_hash, Config};
use catalog_harvest::crawler::run_pipeline;
use catalog_harvest::output::{export_stored_csv, load_statistics, print_statistics};
use catalog_harvest::storage::{open_storage, Storage};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Catalog-Harvest: crawl a paginated catalog into SQLite
///
/// Catalog-Harvest walks every listing page of a catalog, extracts one record
/// per detail page, replaces the stored table with the result and serves
/// it over a small JSON API.
#[derive(Parser, Debug)]
#[command(name = "catalog-harvest")]
#[command(version = "1.0.0")]
#[command(about = "Crawl a paginated catalog into SQLite", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "export_csv", "serve"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_csv", "serve"])]
    stats: bool,

    /// Export the stored books to the configured CSV path and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "serve"])]
    export_csv: bool,

    /// Serve the read API (optionally crawling on startup)
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "export_csv"])]
    serve: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.export_csv {
        handle_export_csv(&config)
    } else if cli.serve {
        handle_serve(config, &config_hash).await
    } else {
        handle_crawl(&config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_harvest=info,warn"),
            1 => EnvFilter::new("catalog_harvest=debug,tower_http=debug,info"),
            2 => EnvFilter::new("catalog_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Catalog-Harvest Dry Run ===\n");

    println!("Catalog:");
    println!("  Base URL: {}", config.catalog.base_url);
    println!("  First page: {}", config.catalog.first_page);
    println!("  Request delay: {}ms", config.catalog.request_delay_ms);
    println!("  Item failure policy: {}", config.catalog.item_failure_policy);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    match &config.output.csv_path {
        Some(path) => println!("  CSV: {}", path),
        None => println!("  CSV: (disabled)"),
    }

    println!("\nAPI:");
    println!("  Bind address: {}", config.api.bind_address);
    println!(
        "  Trigger JWT secret: {}",
        if config.api.jwt_secret.is_some() {
            "configured"
        } else {
            "(none, trigger disabled)"
        }
    );
    println!("  Crawl on startup: {}", config.api.crawl_on_startup);

    let start = config
        .first_listing_url()
        .context("failed to resolve the first listing URL")?;
    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling at {}", start);

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-csv mode: writes the stored table to the CSV path
fn handle_export_csv(config: &Config) -> anyhow::Result<()> {
    let Some(csv_path) = &config.output.csv_path else {
        bail!("--export-csv needs output.csv-path in the configuration");
    };

    println!("=== Exporting Books ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", csv_path);
    println!();

    let books = {
        let storage = open_storage(Path::new(&config.output.database_path))?;
        storage.list_books()?
    };

    let rows = export_stored_csv(Path::new(csv_path), &books)
        .with_context(|| format!("failed to write {}", csv_path))?;
    println!("✓ Exported {} books to: {}", rows, csv_path);

    Ok(())
}

/// Handles the --serve mode
async fn handle_serve(config: Config, config_hash: &str) -> anyhow::Result<()> {
    if config.api.jwt_secret.is_none() {
        bail!("--serve needs api.jwt-secret in the configuration");
    }

    catalog_harvest::api::serve(config, config_hash).await?;
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {} (item failure policy: {})",
        config.catalog.base_url,
        config.catalog.item_failure_policy
    );

    let report = match run_pipeline(config, config_hash).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Pipeline failed: {}", e);
            return Err(e.into());
        }
    };

    let outcome = &report.outcome;
    tracing::info!(
        "Run {} {}: {} listing pages, {} records extracted, {} persisted, {} skipped ({})",
        report.run_id,
        report.status.to_db_string(),
        outcome.listing_pages,
        outcome.records.len(),
        report.persisted,
        outcome.skipped_items.len(),
        outcome.termination
    );
    if let Some(path) = &report.csv_path {
        tracing::info!("CSV written to {}", path.display());
    }

    Ok(())
}
