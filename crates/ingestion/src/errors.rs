//! ETL error types
//!
//! These occur inside the asynchronous materialization job and are never
//! surfaced to the upload caller; they terminate the job and leave the
//! dataset in `failed` status, discoverable only by polling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("No values to impute {field} from")]
    Imputation { field: String },

    #[error("Unparseable order date at row {row}: {value}")]
    DateParse { row: usize, value: String },

    #[error("Unparseable number in {column} at row {row}")]
    NumberParse { row: usize, column: String },

    #[error("Database error: {0}")]
    Database(String),
}

impl From<salesforge_common::errors::AppError> for EtlError {
    fn from(e: salesforge_common::errors::AppError) -> Self {
        EtlError::Database(e.to_string())
    }
}

impl From<sea_orm::DbErr> for EtlError {
    fn from(e: sea_orm::DbErr) -> Self {
        EtlError::Database(e.to_string())
    }
}
