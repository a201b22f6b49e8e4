//! Storage module for persisting harvested records
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Atomic full replacement of the record set
//! - Read queries used by the API and CLI reports
//! - Run bookkeeping

mod schema;
mod sqlite;
mod traits;

pub use schema::BOOKS_TABLE;
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::crawler::BookRecord;
use crate::HarvestError;
use serde::Serialize;
use std::path::Path;

/// Initializes or opens a storage database
///
/// The `books` table is created if it does not exist yet.
pub fn open_storage(path: &Path) -> Result<SqliteStorage, HarvestError> {
    SqliteStorage::new(path)
}

/// A persisted book with its position-derived id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredBook {
    pub id: i64,
    #[serde(flatten)]
    pub record: BookRecord,
}

/// Represents a pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub records: u64,
    pub error: Option<String>,
}

/// Status of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Crawl or persistence still in progress
    Running,
    /// Pagination exhausted and every record persisted
    Completed,
    /// Run ended early; the records gathered before the failure were persisted
    Partial,
    /// No records were gathered; the table was left untouched
    Empty,
    /// Persistence failed; the table was left untouched
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Empty => "empty",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "partial" => Some(Self::Partial),
            "empty" => Some(Self::Empty),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
