//! Detail page extraction
//!
//! A detail page describes one catalog item. Fields are pulled out through
//! [`DETAIL_FIELDS`], a table mapping each record field to the rule that
//! locates it. Product-table values are found by their row label rather than
//! by row position, so a markup change means editing one table entry.

use crate::HarvestError;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// One extracted catalog entry
///
/// Prices and tax are kept exactly as displayed (e.g. `£51.77`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub category: String,
    pub title: String,
    pub description: String,
    pub price: String,
    pub tax: String,
    pub availability: String,
}

/// Fields of a [`BookRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookField {
    Category,
    Title,
    Description,
    Price,
    Tax,
    Availability,
}

impl BookField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Title => "title",
            Self::Description => "description",
            Self::Price => "price",
            Self::Tax => "tax",
            Self::Availability => "availability",
        }
    }
}

/// How a field is located in a detail page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Link text of the breadcrumb entry at `level` (0-based)
    Breadcrumb {
        items: &'static str,
        level: usize,
    },

    /// Text of the first element matching the selector
    Text(&'static str),

    /// Value cell of the table row whose header cell reads `label`
    TableRow {
        rows: &'static str,
        label: &'static str,
    },
}

/// One entry of the field-selector table
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: BookField,
    pub rule: FieldRule,
    /// A missing required field fails the page; a missing optional one is empty
    pub required: bool,
}

const PRODUCT_TABLE_ROWS: &str = "table.table-striped tr";

/// Field-selector table for catalog detail pages
pub const DETAIL_FIELDS: [FieldSpec; 6] = [
    FieldSpec {
        field: BookField::Category,
        rule: FieldRule::Breadcrumb {
            items: "ul.breadcrumb li",
            level: 2,
        },
        required: true,
    },
    FieldSpec {
        field: BookField::Title,
        rule: FieldRule::Text("div.product_main h1"),
        required: true,
    },
    FieldSpec {
        field: BookField::Description,
        rule: FieldRule::Text("div#product_description ~ p"),
        required: false,
    },
    FieldSpec {
        field: BookField::Price,
        rule: FieldRule::TableRow {
            rows: PRODUCT_TABLE_ROWS,
            label: "Price (incl. tax)",
        },
        required: true,
    },
    FieldSpec {
        field: BookField::Tax,
        rule: FieldRule::TableRow {
            rows: PRODUCT_TABLE_ROWS,
            label: "Tax",
        },
        required: true,
    },
    FieldSpec {
        field: BookField::Availability,
        rule: FieldRule::TableRow {
            rows: PRODUCT_TABLE_ROWS,
            label: "Availability",
        },
        required: true,
    },
];

impl BookRecord {
    fn set(&mut self, field: BookField, value: String) {
        match field {
            BookField::Category => self.category = value,
            BookField::Title => self.title = value,
            BookField::Description => self.description = value,
            BookField::Price => self.price = value,
            BookField::Tax => self.tax = value,
            BookField::Availability => self.availability = value,
        }
    }
}

/// Extracts a [`BookRecord`] from a detail page
///
/// # Arguments
///
/// * `html` - The detail page body
/// * `page_url` - URL of the page, used in error reports
///
/// # Returns
///
/// * `Ok(BookRecord)` - Every required field was found
/// * `Err(HarvestError::Extraction)` - A required field is missing or empty
pub fn extract_book(html: &str, page_url: &Url) -> Result<BookRecord, HarvestError> {
    let document = Html::parse_document(html);
    extract_fields(&document, &DETAIL_FIELDS, page_url)
}

/// Applies a field-selector table to a parsed document
pub fn extract_fields(
    document: &Html,
    fields: &[FieldSpec],
    page_url: &Url,
) -> Result<BookRecord, HarvestError> {
    let mut record = BookRecord::default();

    for entry in fields {
        match apply_rule(document, entry.rule) {
            Some(value) => record.set(entry.field, value),
            None if entry.required => {
                return Err(HarvestError::Extraction {
                    url: page_url.to_string(),
                    field: entry.field.as_str().to_string(),
                });
            }
            None => {}
        }
    }

    Ok(record)
}

/// Runs one rule; empty text counts as missing
fn apply_rule(document: &Html, rule: FieldRule) -> Option<String> {
    let value = match rule {
        FieldRule::Breadcrumb { items, level } => {
            let item_selector = Selector::parse(items).ok()?;
            let link_selector = Selector::parse("a").ok()?;
            let item = document.select(&item_selector).nth(level)?;
            item.select(&link_selector).next().map(element_text)?
        }
        FieldRule::Text(selector) => {
            let selector = Selector::parse(selector).ok()?;
            document.select(&selector).next().map(element_text)?
        }
        FieldRule::TableRow { rows, label } => {
            let row_selector = Selector::parse(rows).ok()?;
            let header_selector = Selector::parse("th").ok()?;
            let cell_selector = Selector::parse("td").ok()?;

            document
                .select(&row_selector)
                .find(|row| {
                    row.select(&header_selector)
                        .next()
                        .map(|th| element_text(th) == label)
                        .unwrap_or(false)
                })
                .and_then(|row| row.select(&cell_selector).next())
                .map(element_text)?
        }
    };

    Some(value).filter(|v| !v.is_empty())
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
