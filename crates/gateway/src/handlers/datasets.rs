//! Dataset handlers: upload intake, listing, status polling, detail
//! views, export, and deletion

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use salesforge_analytics::{
    aggregate, run_query, DatasetAggregates, QueryParams, RecordFilter, SortDir, SortKey,
    DEFAULT_PAGE_SIZE,
};
use salesforge_common::{
    auth::AuthContext,
    db::models::{Dataset, SalesRecord},
    errors::{AppError, Result},
};
use salesforge_ingestion::{parse_csv, validate::extract_rows, MaterializeJob};

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub filename: String,
}

/// Immediate response to an accepted upload; summary fields stay zeroed
/// until the materialization job finishes
#[derive(Serialize)]
pub struct UploadStats {
    pub dataset_id: Uuid,
    pub status: String,
    pub row_count: i64,
    pub rows_dropped: i64,
    pub date_min: Option<DateTime<Utc>>,
    pub date_max: Option<DateTime<Utc>>,
    pub total_sales: f64,
}

#[derive(Serialize)]
pub struct DatasetSummaryResponse {
    pub id: Uuid,
    pub filename: String,
    pub row_count: i64,
    pub rows_dropped: i64,
    pub total_sales: f64,
    pub date_min: Option<DateTime<Utc>>,
    pub date_max: Option<DateTime<Utc>>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Dataset> for DatasetSummaryResponse {
    fn from(dataset: Dataset) -> Self {
        Self {
            id: dataset.id,
            filename: dataset.filename,
            row_count: dataset.row_count,
            rows_dropped: dataset.rows_dropped,
            total_sales: dataset.total_sales,
            date_min: dataset.date_min,
            date_max: dataset.date_max,
            status: dataset.status,
            created_at: dataset.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct DatasetListResponse {
    pub datasets: Vec<DatasetSummaryResponse>,
}

#[derive(Serialize)]
pub struct RecordResponse {
    pub id: i32,
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

impl From<SalesRecord> for RecordResponse {
    fn from(record: SalesRecord) -> Self {
        Self {
            id: record.id,
            order_number: record.order_number,
            quantity_ordered: record.quantity_ordered,
            price_each: record.price_each,
            sales: record.sales,
            order_date: record.order_date,
            status: record.status,
            month_id: record.month_id,
            year_id: record.year_id,
            product_line: record.product_line,
            product_code: record.product_code,
            customer_name: record.customer_name,
            country: record.country,
            deal_size: record.deal_size,
            total_sales: record.total_sales,
            order_quarter: record.order_quarter,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DetailParams {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
    pub status_filter: Option<String>,
    pub product_line: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Serialize)]
pub struct DatasetDetailResponse {
    pub id: Uuid,
    pub filename: String,
    pub row_count: i64,
    pub date_min: Option<DateTime<Utc>>,
    pub date_max: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub status: String,
    pub aggregates: DatasetAggregates,
    pub records: Vec<RecordResponse>,
    pub page: u64,
    pub page_size: u64,
    pub total_records: u64,
}

/// Accept a CSV upload for ETL processing.
///
/// Parse and column validation happen synchronously; a rejected upload
/// never creates a dataset. The accepted payload is handed to the
/// materialization worker and the dataset handle returns immediately in
/// `processing` state.
pub async fn upload(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadStats>)> {
    if !params.filename.ends_with(".csv") {
        return Err(AppError::InvalidFilename);
    }

    let limit = state.config.upload.max_upload_bytes;
    if body.len() > limit {
        return Err(AppError::PayloadTooLarge {
            size: body.len(),
            limit,
        });
    }

    let table = parse_csv(&body)?;
    let rows = extract_rows(&table)?;

    let dataset = state
        .repo
        .create_dataset(auth.user_id, params.filename)
        .await?;

    state.queue.submit(MaterializeJob {
        dataset_id: dataset.id,
        rows,
    })?;

    tracing::info!(
        dataset_id = %dataset.id,
        user_id = %auth.user_id,
        filename = %dataset.filename,
        "Upload accepted; materialization queued"
    );

    Ok((
        StatusCode::CREATED,
        Json(UploadStats {
            dataset_id: dataset.id,
            status: dataset.status,
            row_count: 0,
            rows_dropped: 0,
            date_min: None,
            date_max: None,
            total_sales: 0.0,
        }),
    ))
}

/// List all datasets for the current user, newest first
pub async fn list_datasets(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<DatasetListResponse>> {
    let datasets = state
        .repo
        .datasets_for_user(auth.user_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(DatasetListResponse { datasets }))
}

/// Poll dataset processing status
pub async fn get_dataset_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(dataset_id): Path<Uuid>,
) -> Result<Json<DatasetSummaryResponse>> {
    let dataset = state
        .repo
        .find_dataset_for_user(dataset_id, auth.user_id)
        .await?
        .ok_or_else(AppError::dataset_not_found)?;

    Ok(Json(dataset.into()))
}

/// Get dataset detail with aggregates and one page of records.
///
/// A dataset still in `processing` reads as zero records and zero-valued
/// aggregates; the status field tells the two states apart.
pub async fn get_dataset(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(dataset_id): Path<Uuid>,
    Query(params): Query<DetailParams>,
) -> Result<Json<DatasetDetailResponse>> {
    let dataset = state
        .repo
        .find_dataset_for_user(dataset_id, auth.user_id)
        .await?
        .ok_or_else(AppError::dataset_not_found)?;

    let records = state.repo.records_for_dataset(dataset_id).await?;

    // Aggregates always cover the full dataset; only the record page
    // sees the filters
    let aggregates = aggregate(&records);

    let query = QueryParams {
        page: params.page.unwrap_or(1),
        page_size: params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        sort_by: SortKey::parse_or_default(params.sort_by.as_deref().unwrap_or("")),
        sort_dir: SortDir::parse_or_default(params.sort_dir.as_deref().unwrap_or("")),
        filter: RecordFilter {
            status: params.status_filter,
            product_line: params.product_line,
            date_from: parse_query_date(params.date_from.as_deref(), "date_from")?,
            date_to: parse_query_date(params.date_to.as_deref(), "date_to")?,
        },
    };

    let page = run_query(records, &query);

    Ok(Json(DatasetDetailResponse {
        id: dataset.id,
        filename: dataset.filename,
        row_count: dataset.row_count,
        date_min: dataset.date_min,
        date_max: dataset.date_max,
        created_at: dataset.created_at,
        status: dataset.status,
        aggregates,
        records: page.records.into_iter().map(Into::into).collect(),
        page: page.page,
        page_size: page.page_size,
        total_records: page.total_records,
    }))
}

/// Export dataset records as CSV, ordered by order number
pub async fn export_dataset(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(dataset_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let dataset = state
        .repo
        .find_dataset_for_user(dataset_id, auth.user_id)
        .await?
        .ok_or_else(AppError::dataset_not_found)?;

    let mut records = state.repo.records_for_dataset(dataset_id).await?;
    records.sort_by_key(|r| r.order_number);

    let body = write_export_csv(&records)?;

    let stem = dataset
        .filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(&dataset.filename);
    let disposition = format!("attachment; filename=\"{}.csv\"", stem);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

/// Delete a dataset and all of its records
pub async fn delete_dataset(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(dataset_id): Path<Uuid>,
) -> Result<StatusCode> {
    state
        .repo
        .find_dataset_for_user(dataset_id, auth.user_id)
        .await?
        .ok_or_else(AppError::dataset_not_found)?;

    state.repo.delete_dataset(dataset_id).await?;

    tracing::info!(
        dataset_id = %dataset_id,
        user_id = %auth.user_id,
        "Dataset deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Parse an optional date filter value; dates and datetimes are both
/// accepted, date-only values reading as midnight UTC
fn parse_query_date(value: Option<&str>, param: &str) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = value else {
        return Ok(None);
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Some(Utc.from_utc_datetime(&dt)));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Some(Utc.from_utc_datetime(&dt)));
        }
    }

    Err(AppError::InvalidRequest {
        message: format!("Unparseable {}: {}", param, raw),
    })
}

/// Serialize records to CSV with internal identity columns excluded
fn write_export_csv(records: &[SalesRecord]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record([
            "order_number",
            "quantity_ordered",
            "price_each",
            "sales",
            "order_date",
            "status",
            "month_id",
            "year_id",
            "product_line",
            "product_code",
            "customer_name",
            "country",
            "deal_size",
            "total_sales",
            "order_quarter",
        ])
        .map_err(|e| AppError::Internal {
            message: format!("CSV export failed: {}", e),
        })?;

    for record in records {
        writer
            .write_record([
                record.order_number.to_string(),
                record.quantity_ordered.to_string(),
                record.price_each.to_string(),
                record.sales.to_string(),
                record.order_date.format("%Y-%m-%d %H:%M:%S").to_string(),
                record.status.clone(),
                record.month_id.to_string(),
                record.year_id.to_string(),
                record.product_line.clone(),
                record.product_code.clone(),
                record.customer_name.clone(),
                record.country.clone(),
                record.deal_size.clone(),
                record.total_sales.to_string(),
                record.order_quarter.clone(),
            ])
            .map_err(|e| AppError::Internal {
                message: format!("CSV export failed: {}", e),
            })?;
    }

    let bytes = writer.into_inner().map_err(|e| AppError::Internal {
        message: format!("CSV export failed: {}", e),
    })?;

    String::from_utf8(bytes).map_err(|e| AppError::Internal {
        message: format!("CSV export failed: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_date_accepts_date_and_datetime() {
        let date = parse_query_date(Some("2003-05-07"), "date_from")
            .unwrap()
            .unwrap();
        assert_eq!(date.to_string(), "2003-05-07 00:00:00 UTC");

        let datetime = parse_query_date(Some("2003-05-07 10:30:00"), "date_from")
            .unwrap()
            .unwrap();
        assert_eq!(datetime.to_string(), "2003-05-07 10:30:00 UTC");

        assert!(parse_query_date(None, "date_from").unwrap().is_none());
    }

    #[test]
    fn test_parse_query_date_rejects_garbage() {
        assert!(parse_query_date(Some("yesterday"), "date_to").is_err());
    }
}
