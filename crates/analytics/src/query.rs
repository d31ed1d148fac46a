//! Query engine
//!
//! Applies filter predicates, sort order, and pagination over a dataset's
//! stored records. Sorting is stable, so rows that tie on the sort key
//! keep the natural row order they were fetched in.

use chrono::{DateTime, Utc};
use salesforge_common::db::models::SalesRecord;
use serde::Deserialize;
use std::cmp::Ordering;

/// Default page size when the caller does not specify one
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Hard upper bound on page size
pub const MAX_PAGE_SIZE: u64 = 100;

/// Fields records may be sorted by.
///
/// Anything outside this allow-list silently falls back to the default
/// sort key; an unknown key is never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    OrderNumber,
    OrderDate,
    Sales,
    TotalSales,
    CustomerName,
    ProductLine,
    Status,
    DealSize,
}

impl SortKey {
    /// Parse a requested sort key, falling back to the default for
    /// anything not on the allow-list.
    pub fn parse_or_default(key: &str) -> Self {
        match key {
            "order_number" => SortKey::OrderNumber,
            "order_date" => SortKey::OrderDate,
            "sales" => SortKey::Sales,
            "total_sales" => SortKey::TotalSales,
            "customer_name" => SortKey::CustomerName,
            "product_line" => SortKey::ProductLine,
            "status" => SortKey::Status,
            "deal_size" => SortKey::DealSize,
            _ => SortKey::default(),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    pub fn parse_or_default(dir: &str) -> Self {
        match dir {
            "desc" => SortDir::Desc,
            _ => SortDir::Asc,
        }
    }
}

/// Filter predicates over a dataset's records
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Exact match on order status
    pub status: Option<String>,

    /// Exact match on product line
    pub product_line: Option<String>,

    /// Inclusive lower bound on order date
    pub date_from: Option<DateTime<Utc>>,

    /// Inclusive upper bound on order date
    pub date_to: Option<DateTime<Utc>>,
}

impl RecordFilter {
    fn matches(&self, record: &SalesRecord) -> bool {
        if let Some(ref status) = self.status {
            if &record.status != status {
                return false;
            }
        }
        if let Some(ref product_line) = self.product_line {
            if &record.product_line != product_line {
                return false;
            }
        }
        if let Some(from) = self.date_from {
            if record.order_date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if record.order_date > to {
                return false;
            }
        }
        true
    }
}

/// One record-page request
#[derive(Debug, Clone)]
pub struct QueryParams {
    pub page: u64,
    pub page_size: u64,
    pub sort_by: SortKey,
    pub sort_dir: SortDir,
    pub filter: RecordFilter,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: SortKey::default(),
            sort_dir: SortDir::default(),
            filter: RecordFilter::default(),
        }
    }
}

/// One page of records plus the pre-pagination filtered total
#[derive(Debug, Clone)]
pub struct RecordPage {
    pub records: Vec<SalesRecord>,
    pub total_records: u64,
    pub page: u64,
    pub page_size: u64,
}

/// Filter, sort, and paginate a dataset's records.
///
/// `records` must be in natural row order; the filtered total is counted
/// before pagination so clients can compute page counts.
pub fn run_query(records: Vec<SalesRecord>, params: &QueryParams) -> RecordPage {
    let page = params.page.max(1);
    let page_size = params.page_size.clamp(1, MAX_PAGE_SIZE);

    let mut filtered: Vec<SalesRecord> = records
        .into_iter()
        .filter(|r| params.filter.matches(r))
        .collect();

    let total_records = filtered.len() as u64;

    filtered.sort_by(|a, b| {
        let ordering = compare(a, b, params.sort_by);
        match params.sort_dir {
            SortDir::Asc => ordering,
            SortDir::Desc => ordering.reverse(),
        }
    });

    let offset = ((page - 1) * page_size) as usize;
    let records = filtered
        .into_iter()
        .skip(offset)
        .take(page_size as usize)
        .collect();

    RecordPage {
        records,
        total_records,
        page,
        page_size,
    }
}

fn compare(a: &SalesRecord, b: &SalesRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::OrderNumber => a.order_number.cmp(&b.order_number),
        SortKey::OrderDate => a.order_date.cmp(&b.order_date),
        SortKey::Sales => total_order(a.sales, b.sales),
        SortKey::TotalSales => total_order(a.total_sales, b.total_sales),
        SortKey::CustomerName => a.customer_name.cmp(&b.customer_name),
        SortKey::ProductLine => a.product_line.cmp(&b.product_line),
        SortKey::Status => a.status.cmp(&b.status),
        SortKey::DealSize => a.deal_size.cmp(&b.deal_size),
    }
}

fn total_order(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}
