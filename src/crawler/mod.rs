//! Crawler module for catalog traversal and persistence
//!
//! This module contains the crawl-and-persist pipeline, including:
//! - HTTP fetching over one reusable client
//! - Listing page parsing (item links, next page)
//! - Detail page field extraction
//! - Crawl coordination
//! - Atomic replacement of the persisted record set

mod coordinator;
mod detail;
mod fetcher;
mod parser;

pub use coordinator::{Coordinator, CrawlOutcome, Termination};
pub use detail::{
    extract_book, extract_fields, BookField, BookRecord, FieldRule, FieldSpec, DETAIL_FIELDS,
};
pub use fetcher::{build_http_client, user_agent_string, PageFetcher};
pub use parser::{extract_item_links, parse_listing, resolve_next_page, ListingPage};

use crate::config::Config;
use crate::output::write_books_csv;
use crate::storage::{open_storage, RunStatus, Storage};
use crate::HarvestError;
use std::path::{Path, PathBuf};

/// Summary of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Bookkeeping id in the `crawl_runs` table
    pub run_id: i64,

    /// Final run status
    pub status: RunStatus,

    /// Rows written to the books table (0 when the table was left untouched)
    pub persisted: usize,

    /// Where the CSV export was written, if it was
    pub csv_path: Option<PathBuf>,

    /// The crawl result
    pub outcome: CrawlOutcome,
}

/// Runs one crawl and returns the accumulated records
///
/// Nothing is persisted; see [`run_pipeline`] for the full run.
pub async fn crawl(config: &Config) -> Result<CrawlOutcome, HarvestError> {
    let mut coordinator = Coordinator::new(config)?;
    coordinator.run().await
}

/// Replaces the persisted record set with `records`
///
/// An empty slice returns `Ok(0)` without opening the database, so a failed
/// or empty crawl never wipes previously stored data. The storage handle is
/// scoped to this call and released on every exit path.
pub fn persist_records(
    database_path: &Path,
    records: &[BookRecord],
) -> Result<usize, HarvestError> {
    if records.is_empty() {
        tracing::warn!("Crawl produced no records, skipping persistence");
        return Ok(0);
    }

    let mut storage = open_storage(database_path)
        .map_err(|e| HarvestError::Persistence(format!("failed to open database: {}", e)))?;

    storage
        .replace_books(records)
        .map_err(|e| HarvestError::Persistence(e.to_string()))
}

/// Runs the complete pipeline: crawl, persist, export, and record the run
///
/// # Run Status
///
/// | Outcome | Status |
/// |---------|--------|
/// | No records | `empty` (table untouched) |
/// | Listing or item failure ended the run | `partial` |
/// | Pagination exhausted or empty listing | `completed` |
/// | Persistence failed | `failed` (table untouched) |
pub async fn run_pipeline(config: &Config, config_hash: &str) -> Result<PipelineReport, HarvestError> {
    let database_path = Path::new(&config.output.database_path);

    let run_id = {
        let mut storage = open_storage(database_path)?;
        storage.create_run(config_hash)?
    };
    tracing::info!("Starting pipeline run {}", run_id);

    let outcome = match crawl(config).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            record_failure(database_path, run_id, &e);
            return Err(e);
        }
    };

    let persisted = match persist_records(database_path, &outcome.records) {
        Ok(count) => count,
        Err(e) => {
            tracing::error!("Persisting {} records failed: {}", outcome.records.len(), e);
            record_failure(database_path, run_id, &e);
            return Err(e);
        }
    };

    let csv_path = match (&config.output.csv_path, persisted) {
        (Some(path), count) if count > 0 => {
            let path = PathBuf::from(path);
            match write_books_csv(&path, &outcome.records) {
                Ok(rows) => {
                    tracing::info!("Exported {} records to {}", rows, path.display());
                    Some(path)
                }
                Err(e) => {
                    tracing::error!("CSV export to {} failed: {}", path.display(), e);
                    None
                }
            }
        }
        _ => None,
    };

    let status = if outcome.records.is_empty() {
        RunStatus::Empty
    } else if outcome.termination.is_failure() {
        RunStatus::Partial
    } else {
        RunStatus::Completed
    };

    let note = run_note(&outcome);
    {
        let mut storage = open_storage(database_path)?;
        storage.finish_run(run_id, status, persisted, note.as_deref())?;
    }

    tracing::info!(
        "Pipeline run {} finished: {} ({} records persisted)",
        run_id,
        status.to_db_string(),
        persisted
    );

    Ok(PipelineReport {
        run_id,
        status,
        persisted,
        csv_path,
        outcome,
    })
}

/// Text stored with the run: the failure reason and any skipped items
fn run_note(outcome: &CrawlOutcome) -> Option<String> {
    let mut parts = Vec::new();
    if outcome.termination.is_failure() {
        parts.push(outcome.termination.to_string());
    }
    if !outcome.skipped_items.is_empty() {
        parts.push(format!("skipped {} items", outcome.skipped_items.len()));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

fn record_failure(database_path: &Path, run_id: i64, error: &HarvestError) {
    let result = open_storage(database_path).and_then(|mut storage| {
        storage
            .finish_run(run_id, RunStatus::Failed, 0, Some(&error.to_string()))
            .map_err(HarvestError::from)
    });

    if let Err(e) = result {
        tracing::error!("Could not record failure of run {}: {}", run_id, e);
    }
}
