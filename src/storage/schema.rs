//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Catalog-Harvest database.
//! The schema is fixed; there are no automatic migrations.

/// Name of the table holding the current record set
pub const BOOKS_TABLE: &str = "books";

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Current record set, replaced wholesale by every successful run
CREATE TABLE IF NOT EXISTS books (
    id INTEGER PRIMARY KEY,
    category TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    price TEXT NOT NULL,
    tax TEXT NOT NULL,
    availability TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_books_category ON books(category);

-- Track pipeline runs
CREATE TABLE IF NOT EXISTS crawl_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    records INTEGER NOT NULL DEFAULT 0,
    error TEXT
);
"#;

/// Initializes the database schema
///
/// Safe to call on an existing database; every statement is `IF NOT EXISTS`.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
