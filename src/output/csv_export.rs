//! CSV export of harvested records
//!
//! Files are always overwritten and always start with a header row. Rows go
//! to a temporary file in the target directory, which is renamed over the
//! target once complete, so readers never see a partial export.

use crate::crawler::BookRecord;
use crate::storage::StoredBook;
use crate::HarvestError;
use std::fs::File;
use std::path::Path;
use tempfile::NamedTempFile;

/// Header written for stored books (crawl exports derive theirs from `BookRecord`)
const STORED_HEADER: [&str; 7] = [
    "id",
    "category",
    "title",
    "description",
    "price",
    "tax",
    "availability",
];

/// Writes freshly crawled records
///
/// Columns: `category,title,description,price,tax,availability`.
///
/// # Returns
///
/// The number of data rows written
pub fn write_books_csv(path: &Path, records: &[BookRecord]) -> Result<usize, HarvestError> {
    replace_file(path, |writer| {
        if records.is_empty() {
            // serialize() emits the header with the first row only
            writer.write_record(&STORED_HEADER[1..])?;
        }
        for record in records {
            writer.serialize(record)?;
        }
        Ok(records.len())
    })
}

/// Writes the persisted table, ids included
pub fn export_stored_csv(path: &Path, books: &[StoredBook]) -> Result<usize, HarvestError> {
    replace_file(path, |writer| {
        writer.write_record(STORED_HEADER)?;

        for book in books {
            let id = book.id.to_string();
            let record = &book.record;
            writer.write_record([
                id.as_str(),
                &record.category,
                &record.title,
                &record.description,
                &record.price,
                &record.tax,
                &record.availability,
            ])?;
        }
        Ok(books.len())
    })
}

/// Runs `write_rows` against a temporary sibling of `path`, then renames it into place
///
/// On any error the temporary file is removed and `path` is left as it was.
fn replace_file<F>(path: &Path, write_rows: F) -> Result<usize, HarvestError>
where
    F: FnOnce(&mut csv::Writer<&File>) -> Result<usize, HarvestError>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let temp = NamedTempFile::new_in(dir)?;

    let rows = {
        let mut writer = csv::Writer::from_writer(temp.as_file());
        let rows = write_rows(&mut writer)?;
        writer.flush()?;
        rows
    };

    temp.persist(path).map_err(|e| HarvestError::Io(e.error))?;
    Ok(rows)
}
