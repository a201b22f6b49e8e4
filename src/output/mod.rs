//! Output module for exports and reports
//!
//! This module handles:
//! - Exporting records to CSV
//! - Loading and printing catalog statistics

mod csv_export;
pub mod stats;

pub use csv_export::{export_stored_csv, write_books_csv};
pub use stats::{load_statistics, print_statistics, CatalogStatistics};
