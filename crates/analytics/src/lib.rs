//! SalesForge read-side engines
//!
//! Pure query and aggregation logic over a dataset's canonical records.
//! Both engines take plain record data fetched by the repository in
//! natural row order and are independent of the persistence mechanism.

pub mod aggregate;
pub mod query;

pub use aggregate::{aggregate, CountrySales, CustomerSales, DatasetAggregates, QuarterlySales};
pub use query::{
    run_query, QueryParams, RecordFilter, RecordPage, SortDir, SortKey, DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE,
};
