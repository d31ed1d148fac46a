//! SalesForge ETL core
//!
//! Turns a raw sales-order CSV export into a canonical, persisted row set:
//! - `source`: CSV decoding into raw rows
//! - `validate`: required-column check
//! - `normalize`: dedup, median imputation, date parsing, derived fields
//! - `processor`: the materialization job body (dataset state machine)
//! - `queue`: in-process dispatch of materialization jobs

pub mod errors;
pub mod normalize;
pub mod processor;
pub mod queue;
pub mod source;
pub mod validate;

pub use errors::EtlError;
pub use normalize::{normalize, CanonicalRow};
pub use processor::materialize_dataset;
pub use queue::{JobQueue, MaterializeJob};
pub use source::{parse_csv, CsvTable, RawRow};
