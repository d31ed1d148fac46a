//! Row Validator
//!
//! Checks an incoming tabular payload for the required sales-order column
//! set before any processing begins. Pure check; reported to the caller
//! synchronously, so no dataset exists for a rejected upload.

use crate::source::{CsvTable, RawRow};
use salesforge_common::errors::{AppError, Result};

/// Columns every upload must carry. Extra columns are ignored.
pub const REQUIRED_COLUMNS: [&str; 13] = [
    "ORDERNUMBER",
    "PRODUCTCODE",
    "QUANTITYORDERED",
    "PRICEEACH",
    "ORDERDATE",
    "SALES",
    "STATUS",
    "MONTH_ID",
    "YEAR_ID",
    "PRODUCTLINE",
    "CUSTOMERNAME",
    "COUNTRY",
    "DEALSIZE",
];

/// Verify the required column set is a subset of the present columns.
///
/// Fails with a validation error listing every missing column, sorted and
/// comma-joined.
pub fn validate_columns(table: &CsvTable) -> Result<()> {
    let mut missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| table.header_index(col).is_none())
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    missing.sort_unstable();
    Err(AppError::Validation {
        columns: missing.join(", "),
    })
}

/// Validate and project the table onto the required columns.
pub fn extract_rows(table: &CsvTable) -> Result<Vec<RawRow>> {
    validate_columns(table)?;

    // Indices exist after validation
    let col = |name: &str| table.header_index(name).unwrap_or_default();

    let order_number = col("ORDERNUMBER");
    let product_code = col("PRODUCTCODE");
    let quantity_ordered = col("QUANTITYORDERED");
    let price_each = col("PRICEEACH");
    let order_date = col("ORDERDATE");
    let sales = col("SALES");
    let status = col("STATUS");
    let month_id = col("MONTH_ID");
    let year_id = col("YEAR_ID");
    let product_line = col("PRODUCTLINE");
    let customer_name = col("CUSTOMERNAME");
    let country = col("COUNTRY");
    let deal_size = col("DEALSIZE");

    let rows = (0..table.len())
        .map(|i| RawRow {
            index: i,
            order_number: table.cell(i, order_number).to_string(),
            product_code: table.cell(i, product_code).to_string(),
            quantity_ordered: table.cell(i, quantity_ordered).to_string(),
            price_each: table.cell(i, price_each).to_string(),
            order_date: table.cell(i, order_date).to_string(),
            sales: table.cell(i, sales).to_string(),
            status: table.cell(i, status).to_string(),
            month_id: table.cell(i, month_id).to_string(),
            year_id: table.cell(i, year_id).to_string(),
            product_line: table.cell(i, product_line).to_string(),
            customer_name: table.cell(i, customer_name).to_string(),
            country: table.cell(i, country).to_string(),
            deal_size: table.cell(i, deal_size).to_string(),
        })
        .collect();

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::parse_csv;

    fn full_header() -> String {
        REQUIRED_COLUMNS.join(",")
    }

    #[test]
    fn test_all_columns_present() {
        let csv = format!("{}\n", full_header());
        let table = parse_csv(csv.as_bytes()).unwrap();
        assert!(validate_columns(&table).is_ok());
    }

    #[test]
    fn test_missing_columns_listed_sorted() {
        let table = parse_csv(b"ORDERNUMBER,PRODUCTCODE\n").unwrap();
        let err = validate_columns(&table).unwrap_err();
        let message = err.to_string();

        // Every absent column appears, in sorted order
        assert!(message.contains("COUNTRY, CUSTOMERNAME, DEALSIZE"));
        assert!(message.contains("MONTH_ID, ORDERDATE, PRICEEACH"));
        assert!(!message.contains("ORDERNUMBER"));
    }

    #[test]
    fn test_extra_columns_ignored() {
        let csv = format!("{},EXTRA_COL\n", full_header());
        let table = parse_csv(csv.as_bytes()).unwrap();
        assert!(validate_columns(&table).is_ok());
    }

    #[test]
    fn test_extract_rows_projects_required_columns() {
        let csv = format!(
            "{},EXTRA\n10100,S18_1749,30,100.0,2/24/2003 0:00,3000.0,Shipped,2,2003,Classic Cars,Land of Toys Inc.,USA,Medium,junk\n",
            full_header()
        );
        let table = parse_csv(csv.as_bytes()).unwrap();
        let rows = extract_rows(&table).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].index, 0);
        assert_eq!(rows[0].order_number, "10100");
        assert_eq!(rows[0].country, "USA");
        assert_eq!(rows[0].deal_size, "Medium");
    }

    #[test]
    fn test_extract_rows_rejects_invalid_table() {
        let table = parse_csv(b"A,B\n1,2\n").unwrap();
        assert!(extract_rows(&table).is_err());
    }
}
