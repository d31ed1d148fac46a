//! Aggregation engine
//!
//! Computes summary rollups over **all** records of a dataset; the query
//! engine's filters never apply here. Group keys are accumulated in
//! first-seen order so ties in the top-10 orderings resolve to natural
//! row order.

use indexmap::IndexMap;
use salesforge_common::db::models::SalesRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Groups returned by the country and customer rollups
pub const TOP_GROUP_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterlySales {
    pub year: i32,
    pub quarter: String,
    pub total_sales: f64,
    pub order_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountrySales {
    pub country: String,
    pub total_sales: f64,
    pub order_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSales {
    pub customer_name: String,
    pub total_sales: f64,
    pub order_count: u64,
}

/// Summary aggregates for one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetAggregates {
    pub total_sales: f64,
    pub total_orders: u64,
    pub avg_order_value: f64,
    pub sales_by_quarter: Vec<QuarterlySales>,
    pub sales_by_country: Vec<CountrySales>,
    pub sales_by_customer: Vec<CustomerSales>,
}

/// Compute summary aggregates over a dataset's full record set.
///
/// A dataset still materializing simply has no records yet, which yields
/// zero-valued aggregates - a valid state, distinguishable via the
/// dataset status.
pub fn aggregate(records: &[SalesRecord]) -> DatasetAggregates {
    let total_sales: f64 = records.iter().map(|r| r.total_sales).sum();

    // One order spans multiple line items; count orders, not records
    let total_orders = records
        .iter()
        .map(|r| r.order_number)
        .collect::<HashSet<_>>()
        .len() as u64;

    let avg_order_value = if total_orders > 0 {
        round2(total_sales / total_orders as f64)
    } else {
        0.0
    };

    DatasetAggregates {
        total_sales,
        total_orders,
        avg_order_value,
        sales_by_quarter: quarter_rollup(records),
        sales_by_country: country_rollup(records),
        sales_by_customer: customer_rollup(records),
    }
}

fn quarter_rollup(records: &[SalesRecord]) -> Vec<QuarterlySales> {
    let mut groups: IndexMap<(i32, String), (f64, u64)> = IndexMap::new();
    for record in records {
        let entry = groups
            .entry((record.year_id, record.order_quarter.clone()))
            .or_insert((0.0, 0));
        entry.0 += record.total_sales;
        entry.1 += 1;
    }

    let mut rollup: Vec<QuarterlySales> = groups
        .into_iter()
        .map(|((year, quarter), (total_sales, order_count))| QuarterlySales {
            year,
            quarter,
            total_sales,
            order_count,
        })
        .collect();

    // Full set, ordered by year then quarter ascending; Q1-Q4 sort
    // lexically
    rollup.sort_by(|a, b| (a.year, &a.quarter).cmp(&(b.year, &b.quarter)));
    rollup
}

fn country_rollup(records: &[SalesRecord]) -> Vec<CountrySales> {
    top_groups(records, |r| &r.country)
        .into_iter()
        .map(|(country, total_sales, order_count)| CountrySales {
            country,
            total_sales,
            order_count,
        })
        .collect()
}

fn customer_rollup(records: &[SalesRecord]) -> Vec<CustomerSales> {
    top_groups(records, |r| &r.customer_name)
        .into_iter()
        .map(|(customer_name, total_sales, order_count)| CustomerSales {
            customer_name,
            total_sales,
            order_count,
        })
        .collect()
}

/// Group by a string key, descending by summed total_sales, top 10 only.
/// The stable sort leaves tied groups in first-seen order.
fn top_groups<F>(records: &[SalesRecord], key: F) -> Vec<(String, f64, u64)>
where
    F: Fn(&SalesRecord) -> &String,
{
    let mut groups: IndexMap<String, (f64, u64)> = IndexMap::new();
    for record in records {
        let entry = groups.entry(key(record).clone()).or_insert((0.0, 0));
        entry.0 += record.total_sales;
        entry.1 += 1;
    }

    let mut rollup: Vec<(String, f64, u64)> = groups
        .into_iter()
        .map(|(key, (total, count))| (key, total, count))
        .collect();

    rollup.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    rollup.truncate(TOP_GROUP_LIMIT);
    rollup
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
