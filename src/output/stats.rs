//! Statistics generation from the catalog database
//!
//! This module provides functionality for extracting and displaying
//! catalog statistics from the storage layer.

use crate::storage::{RunRecord, Storage};
use crate::HarvestError;

/// Catalog statistics summary
#[derive(Debug, Clone)]
pub struct CatalogStatistics {
    /// Number of persisted books
    pub total_books: u64,

    /// Book count per category, largest first
    pub categories: Vec<(String, u64)>,

    /// Most recent pipeline run, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CatalogStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<CatalogStatistics, HarvestError> {
    Ok(CatalogStatistics {
        total_books: storage.count_books()?,
        categories: storage.count_by_category()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CatalogStatistics) {
    println!("=== Catalog Statistics ===\n");

    println!("Overview:");
    println!("  Total books: {}", stats.total_books);
    println!("  Categories: {}", stats.categories.len());
    println!();

    if !stats.categories.is_empty() {
        println!("Books by Category:");
        for (category, count) in &stats.categories {
            println!(
                "  {}: {} ({:.1}%)",
                category,
                count,
                share(*count, stats.total_books)
            );
        }
        println!();
    }

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run (#{}):", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  Records persisted: {}", run.records);
            if let Some(error) = &run.error {
                println!("  Note: {}", error);
            }
        }
        None => println!("No pipeline runs recorded"),
    }
}

fn share(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (count as f64 / total as f64) * 100.0
    }
}
