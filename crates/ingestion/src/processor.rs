//! Dataset materializer
//!
//! Owns the dataset state machine {processing -> ready | failed}. The job
//! body is a plain function of (dataset id, raw rows) with no dependency
//! on the dispatch mechanism, so it can be driven synchronously in tests.

use crate::errors::EtlError;
use crate::normalize::{normalize, CanonicalRow};
use crate::source::RawRow;
use salesforge_common::db::models::SalesRecordActiveModel;
use salesforge_common::db::{DatasetSummary, Repository};
use salesforge_common::metrics::name as metric_name;
use sea_orm::Set;
use std::time::Instant;
use tracing::{error, info, instrument};
use uuid::Uuid;

enum Outcome {
    Persisted { row_count: u64, rows_dropped: u64 },
    DatasetGone,
}

/// Run one materialization job to completion.
///
/// On success the dataset ends `ready` with its records and summary
/// committed atomically; on any failure the dataset ends `failed` with its
/// zeroed counters untouched. Tolerates the dataset having been deleted
/// at any point (no-op).
#[instrument(skip(repo, rows), fields(dataset_id = %dataset_id))]
pub async fn materialize_dataset(repo: &Repository, dataset_id: Uuid, rows: Vec<RawRow>) {
    let started = Instant::now();

    match try_materialize(repo, dataset_id, rows).await {
        Ok(Outcome::Persisted {
            row_count,
            rows_dropped,
        }) => {
            metrics::counter!(metric_name("datasets_processed_total")).increment(1);
            metrics::counter!(metric_name("records_written_total")).increment(row_count);
            metrics::counter!(metric_name("rows_dropped_total")).increment(rows_dropped);

            info!(row_count, rows_dropped, "Dataset materialized");
        }
        Ok(Outcome::DatasetGone) => {
            info!("Dataset deleted before materialization finished; nothing to do");
        }
        Err(err) => {
            metrics::counter!(metric_name("datasets_failed_total")).increment(1);

            error!(error = %err, "Materialization failed");
            if let Err(e) = repo.mark_dataset_failed(dataset_id).await {
                error!(error = %e, "Failed to record dataset failure");
            }
        }
    }

    metrics::histogram!(metric_name("job_duration_seconds"))
        .record(started.elapsed().as_secs_f64());
}

async fn try_materialize(
    repo: &Repository,
    dataset_id: Uuid,
    rows: Vec<RawRow>,
) -> Result<Outcome, EtlError> {
    if repo.find_dataset_by_id(dataset_id).await?.is_none() {
        return Ok(Outcome::DatasetGone);
    }

    let (canonical, rows_dropped) = normalize(rows)?;

    let summary = DatasetSummary {
        row_count: canonical.len() as i64,
        rows_dropped: rows_dropped as i64,
        date_min: canonical.iter().map(|r| r.order_date).min(),
        date_max: canonical.iter().map(|r| r.order_date).max(),
        total_sales: canonical.iter().map(|r| r.total_sales).sum(),
    };

    let row_count = canonical.len() as u64;
    let records = canonical
        .into_iter()
        .map(|row| to_active_model(dataset_id, row))
        .collect();

    let wrote = repo
        .persist_materialization(dataset_id, records, summary)
        .await?;

    if wrote {
        Ok(Outcome::Persisted {
            row_count,
            rows_dropped,
        })
    } else {
        Ok(Outcome::DatasetGone)
    }
}

fn to_active_model(dataset_id: Uuid, row: CanonicalRow) -> SalesRecordActiveModel {
    SalesRecordActiveModel {
        dataset_id: Set(dataset_id),
        order_number: Set(row.order_number),
        quantity_ordered: Set(row.quantity_ordered),
        price_each: Set(row.price_each),
        sales: Set(row.sales),
        order_date: Set(row.order_date),
        status: Set(row.status),
        month_id: Set(row.month_id),
        year_id: Set(row.year_id),
        product_line: Set(row.product_line),
        product_code: Set(row.product_code),
        customer_name: Set(row.customer_name),
        country: Set(row.country),
        deal_size: Set(row.deal_size),
        total_sales: Set(row.total_sales),
        order_quarter: Set(row.order_quarter),
        ..Default::default()
    }
}
