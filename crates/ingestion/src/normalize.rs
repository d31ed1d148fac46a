//! Normalizer (transform engine)
//!
//! Turns validated raw rows into canonical sales-order line items:
//! deduplication, median imputation of missing numerics, mixed-format
//! date parsing, and derived-field computation. Any step failure aborts
//! the whole batch; no partial canonical set is ever produced.

use crate::errors::EtlError;
use crate::source::RawRow;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::collections::HashSet;

/// One normalized sales-order line item, ready to persist
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRow {
    pub order_number: i64,
    pub quantity_ordered: i64,
    pub price_each: f64,
    pub sales: f64,
    pub order_date: DateTime<Utc>,
    pub status: String,
    pub month_id: i32,
    pub year_id: i32,
    pub product_line: String,
    pub product_code: String,
    pub customer_name: String,
    pub country: String,
    pub deal_size: String,
    pub total_sales: f64,
    pub order_quarter: String,
}

/// Normalize a validated row set.
///
/// Returns the canonical rows plus the number of rows dropped by
/// deduplication. Step order matters: imputation and everything after it
/// must see the post-dedup row set.
pub fn normalize(rows: Vec<RawRow>) -> Result<(Vec<CanonicalRow>, u64), EtlError> {
    let original_count = rows.len();

    // Same order + product is the same line item; the first occurrence in
    // file order wins.
    let rows = dedup_first_wins(rows);
    let rows_dropped = (original_count - rows.len()) as u64;

    // An empty (or header-only) file is a valid, empty dataset
    if rows.is_empty() {
        return Ok((Vec::new(), rows_dropped));
    }

    // Median over mean: SALES carries heavy outliers that would skew a
    // mean-based fill.
    let quantity = impute_numeric(&rows, "QUANTITYORDERED", |r| &r.quantity_ordered)?;
    let price = impute_numeric(&rows, "PRICEEACH", |r| &r.price_each)?;
    let sales = impute_numeric(&rows, "SALES", |r| &r.sales)?;
    let month = impute_numeric(&rows, "MONTH_ID", |r| &r.month_id)?;
    let year = impute_numeric(&rows, "YEAR_ID", |r| &r.year_id)?;

    let mut canonical = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let order_date =
            parse_order_date(&row.order_date).ok_or_else(|| EtlError::DateParse {
                row: row.index,
                value: row.order_date.clone(),
            })?;

        let order_number = parse_f64(&row.order_number)
            .ok_or_else(|| EtlError::NumberParse {
                row: row.index,
                column: "ORDERNUMBER".to_string(),
            })? as i64;

        let quantity_ordered = quantity[i] as i64;
        let price_each = price[i];

        // The reported SALES figure is kept as-is, but revenue always
        // comes from quantity * price.
        let total_sales = quantity_ordered as f64 * price_each;

        canonical.push(CanonicalRow {
            order_number,
            quantity_ordered,
            price_each,
            sales: sales[i],
            order_date,
            status: row.status.clone(),
            month_id: month[i] as i32,
            year_id: year[i] as i32,
            product_line: row.product_line.clone(),
            product_code: row.product_code.clone(),
            customer_name: row.customer_name.clone(),
            country: row.country.clone(),
            deal_size: row.deal_size.clone(),
            total_sales,
            order_quarter: quarter_for_month(order_date.month()).to_string(),
        });
    }

    Ok((canonical, rows_dropped))
}

/// Keep the first occurrence of each `(order number, product code)` pair,
/// preserving original file order.
fn dedup_first_wins(rows: Vec<RawRow>) -> Vec<RawRow> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|r| {
            seen.insert((
                r.order_number.trim().to_string(),
                r.product_code.trim().to_string(),
            ))
        })
        .collect()
}

/// Resolve one numeric field across the deduplicated set, filling missing
/// cells with the field's median.
///
/// A field with no parseable values at all has no median to fill from and
/// fails the batch.
fn impute_numeric<F>(rows: &[RawRow], field: &str, accessor: F) -> Result<Vec<f64>, EtlError>
where
    F: Fn(&RawRow) -> &String,
{
    let parsed: Vec<Option<f64>> = rows.iter().map(|r| parse_f64(accessor(r))).collect();

    let present: Vec<f64> = parsed.iter().flatten().copied().collect();
    let fill = median(present).ok_or_else(|| EtlError::Imputation {
        field: field.to_string(),
    })?;

    Ok(parsed.into_iter().map(|v| v.unwrap_or(fill)).collect())
}

/// Median of the given values; the mean of the two middle values for an
/// even count. `None` for an empty set.
fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Parse a raw numeric cell; empty and unparseable cells both read as
/// missing.
fn parse_f64(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse().ok()
}

// Source exports mix date formats within a single file; month-first wins
// when a format is ambiguous.
const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d", "%m/%d/%y"];

/// Parse an order-date cell under any recognized format, normalized to
/// UTC.
fn parse_order_date(cell: &str) -> Option<DateTime<Utc>> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
        }
    }

    None
}

/// Calendar quarter for a 1-based month
fn quarter_for_month(month: u32) -> &'static str {
    match month {
        1..=3 => "Q1",
        4..=6 => "Q2",
        7..=9 => "Q3",
        _ => "Q4",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(
        index: usize,
        order_number: &str,
        product_code: &str,
        quantity: &str,
        price: &str,
        date: &str,
    ) -> RawRow {
        RawRow {
            index,
            order_number: order_number.into(),
            product_code: product_code.into(),
            quantity_ordered: quantity.into(),
            price_each: price.into(),
            order_date: date.into(),
            sales: "100.0".into(),
            status: "Shipped".into(),
            month_id: "2".into(),
            year_id: "2003".into(),
            product_line: "Classic Cars".into(),
            customer_name: "Land of Toys Inc.".into(),
            country: "USA".into(),
            deal_size: "Medium".into(),
        }
    }

    fn raw_from_canonical(index: usize, row: &CanonicalRow) -> RawRow {
        RawRow {
            index,
            order_number: row.order_number.to_string(),
            product_code: row.product_code.clone(),
            quantity_ordered: row.quantity_ordered.to_string(),
            price_each: row.price_each.to_string(),
            order_date: row.order_date.format("%Y-%m-%d %H:%M:%S").to_string(),
            sales: row.sales.to_string(),
            status: row.status.clone(),
            month_id: row.month_id.to_string(),
            year_id: row.year_id.to_string(),
            product_line: row.product_line.clone(),
            customer_name: row.customer_name.clone(),
            country: row.country.clone(),
            deal_size: row.deal_size.clone(),
        }
    }

    #[test]
    fn test_dedup_first_wins() {
        let rows = vec![
            raw(0, "10100", "S18_1749", "30", "100.0", "2/24/2003 0:00"),
            raw(1, "10100", "S18_1749", "99", "100.0", "2/24/2003 0:00"),
        ];

        let (canonical, dropped) = normalize(rows).unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(canonical.len(), 1);
        // The kept row carries the first occurrence's quantity
        assert_eq!(canonical[0].quantity_ordered, 30);
    }

    #[test]
    fn test_dedup_idempotent() {
        let rows = vec![
            raw(0, "10100", "S18_1749", "30", "100.0", "2/24/2003 0:00"),
            raw(1, "10100", "S18_1749", "99", "100.0", "2/24/2003 0:00"),
            raw(2, "10101", "S18_2248", "50", "55.0", "3/1/2003 0:00"),
        ];

        let (first_pass, dropped) = normalize(rows).unwrap();
        assert_eq!(dropped, 1);

        // Re-running on its own output drops nothing further
        let again: Vec<RawRow> = first_pass
            .iter()
            .enumerate()
            .map(|(i, r)| raw_from_canonical(i, r))
            .collect();
        let (second_pass, dropped) = normalize(again).unwrap();
        assert_eq!(dropped, 0);
        assert_eq!(second_pass.len(), first_pass.len());
    }

    #[test]
    fn test_median_imputation_odd() {
        let rows = vec![
            raw(0, "1", "A", "10", "5.0", "1/1/2003"),
            raw(1, "2", "B", "", "5.0", "1/1/2003"),
            raw(2, "3", "C", "30", "5.0", "1/1/2003"),
        ];

        let (canonical, _) = normalize(rows).unwrap();
        // Median of [10, 30] fills the blank cell
        assert_eq!(canonical[1].quantity_ordered, 20);
    }

    #[test]
    fn test_median_imputation_even_count() {
        let rows = vec![
            raw(0, "1", "A", "1", "10.0", "1/1/2003"),
            raw(1, "2", "B", "1", "20.0", "1/1/2003"),
            raw(2, "3", "C", "1", "30.0", "1/1/2003"),
            raw(3, "4", "D", "1", "40.0", "1/1/2003"),
            raw(4, "5", "E", "1", "", "1/1/2003"),
        ];

        let (canonical, _) = normalize(rows).unwrap();
        // Median of [10, 20, 30, 40] is 25
        assert_eq!(canonical[4].price_each, 25.0);
    }

    #[test]
    fn test_median_computed_over_deduplicated_set() {
        let rows = vec![
            raw(0, "1", "A", "10", "5.0", "1/1/2003"),
            // Duplicate of the row above; its wild quantity must not
            // reach the median
            raw(1, "1", "A", "100000", "5.0", "1/1/2003"),
            raw(2, "2", "B", "", "5.0", "1/1/2003"),
            raw(3, "3", "C", "30", "5.0", "1/1/2003"),
        ];

        let (canonical, dropped) = normalize(rows).unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(canonical[1].quantity_ordered, 20);
    }

    #[test]
    fn test_unparseable_numeric_treated_as_missing() {
        let rows = vec![
            raw(0, "1", "A", "10", "5.0", "1/1/2003"),
            raw(1, "2", "B", "n/a", "5.0", "1/1/2003"),
            raw(2, "3", "C", "30", "5.0", "1/1/2003"),
        ];

        let (canonical, _) = normalize(rows).unwrap();
        assert_eq!(canonical[1].quantity_ordered, 20);
    }

    #[test]
    fn test_imputation_error_when_field_has_no_values() {
        let rows = vec![
            raw(0, "1", "A", "", "5.0", "1/1/2003"),
            raw(1, "2", "B", "", "5.0", "1/1/2003"),
        ];

        let err = normalize(rows).unwrap_err();
        match err {
            EtlError::Imputation { field } => assert_eq!(field, "QUANTITYORDERED"),
            other => panic!("expected imputation error, got {other:?}"),
        }
    }

    #[test]
    fn test_derived_total_overrides_reported_sales() {
        let mut row = raw(0, "1", "A", "3", "2.5", "1/1/2003");
        row.sales = "999.0".into();

        let (canonical, _) = normalize(vec![row]).unwrap();
        assert_eq!(canonical[0].total_sales, 7.5);
        // The reported figure survives as a separate field
        assert_eq!(canonical[0].sales, 999.0);
    }

    #[test]
    fn test_quarter_mapping() {
        let expected = [
            (1, "Q1"),
            (2, "Q1"),
            (3, "Q1"),
            (4, "Q2"),
            (5, "Q2"),
            (6, "Q2"),
            (7, "Q3"),
            (8, "Q3"),
            (9, "Q3"),
            (10, "Q4"),
            (11, "Q4"),
            (12, "Q4"),
        ];

        for (month, quarter) in expected {
            let date = format!("{}/15/2003", month);
            let (canonical, _) = normalize(vec![raw(0, "1", "A", "1", "1.0", &date)]).unwrap();
            assert_eq!(canonical[0].order_quarter, quarter, "month {}", month);
            assert_eq!(canonical[0].order_date.month(), month);
        }
    }

    #[test]
    fn test_mixed_date_formats_in_one_batch() {
        let rows = vec![
            raw(0, "1", "A", "1", "1.0", "2/24/2003 0:00"),
            raw(1, "2", "B", "1", "1.0", "2003-05-07"),
            raw(2, "3", "C", "1", "1.0", "2003-08-25T10:56:59"),
            raw(3, "4", "D", "1", "1.0", "11/6/03"),
        ];

        let (canonical, _) = normalize(rows).unwrap();
        assert_eq!(canonical[0].order_date.month(), 2);
        assert_eq!(canonical[1].order_date.month(), 5);
        assert_eq!(canonical[2].order_date.month(), 8);
        assert_eq!(canonical[3].order_date.year(), 2003);
        assert_eq!(canonical[3].order_date.month(), 11);
    }

    #[test]
    fn test_ambiguous_date_resolves_month_first() {
        let (canonical, _) =
            normalize(vec![raw(0, "1", "A", "1", "1.0", "3/4/2003")]).unwrap();
        assert_eq!(canonical[0].order_date.month(), 3);
        assert_eq!(canonical[0].order_date.day(), 4);
    }

    #[test]
    fn test_date_parse_error_names_row_index() {
        let rows = vec![
            raw(0, "1", "A", "1", "1.0", "1/1/2003"),
            raw(1, "2", "B", "1", "1.0", "1/1/2003"),
            raw(2, "3", "C", "1", "1.0", "not-a-date"),
        ];

        let err = normalize(rows).unwrap_err();
        match err {
            EtlError::DateParse { row, value } => {
                assert_eq!(row, 2);
                assert_eq!(value, "not-a-date");
            }
            other => panic!("expected date parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_unparseable_order_number_fails_batch() {
        let err = normalize(vec![raw(0, "abc", "A", "1", "1.0", "1/1/2003")]).unwrap_err();
        assert!(matches!(err, EtlError::NumberParse { row: 0, .. }));
    }

    #[test]
    fn test_empty_input_yields_empty_dataset() {
        let (canonical, dropped) = normalize(Vec::new()).unwrap();
        assert!(canonical.is_empty());
        assert_eq!(dropped, 0);
    }
}
