//! CSV source reading
//!
//! Decodes an uploaded payload into a header row plus raw string records.
//! Upload bytes are decoded lossily so latin-1-flavored exports (accented
//! customer and city names) still parse instead of failing on UTF-8.

use csv::{ReaderBuilder, StringRecord};
use salesforge_common::errors::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Parsed tabular payload: headers plus raw records, untyped
#[derive(Debug, Clone)]
pub struct CsvTable {
    headers: Vec<String>,
    records: Vec<StringRecord>,
}

impl CsvTable {
    /// Column names as they appeared in the file
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Position of a column, if present
    pub fn header_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Cell value at (row, column), empty string when absent
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.records
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or("")
    }
}

/// One raw data row projected onto the required column set.
///
/// Columns beyond the required set are dropped here; `index` is the
/// 0-based position of the row in the uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRow {
    pub index: usize,
    pub order_number: String,
    pub product_code: String,
    pub quantity_ordered: String,
    pub price_each: String,
    pub order_date: String,
    pub sales: String,
    pub status: String,
    pub month_id: String,
    pub year_id: String,
    pub product_line: String,
    pub customer_name: String,
    pub country: String,
    pub deal_size: String,
}

/// Parse raw upload bytes into a [`CsvTable`].
///
/// Fails with a `CsvParse` error when the payload is not tabular (ragged
/// records, no header row), before any row-level processing begins.
pub fn parse_csv(bytes: &[u8]) -> Result<CsvTable> {
    let text = String::from_utf8_lossy(bytes);

    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::CsvParse {
            message: e.to_string(),
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| AppError::CsvParse {
            message: e.to_string(),
        })?;
        records.push(record);
    }

    Ok(CsvTable { headers, records })
}
