//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations with proper
//! error handling and transaction support. Handlers and the ETL job talk
//! to this type only; query logic over the fetched rows lives in the
//! analytics crate and stays independent of the persistence mechanism.

use crate::db::models::*;
use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionError, TransactionTrait,
};
use uuid::Uuid;

/// Rows per batched insert; keeps each statement well under SQLite's
/// bind-variable limit
const INSERT_CHUNK: usize = 500;

/// Final summary fields written alongside a successful materialization
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub row_count: i64,
    pub rows_dropped: i64,
    pub date_min: Option<DateTime<Utc>>,
    pub date_max: Option<DateTime<Utc>>,
    pub total_sales: f64,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    conn: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given connection
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Access the underlying connection
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    /// Create a new user
    pub async fn create_user(&self, email: String, password_hash: String) -> Result<User> {
        let user = UserActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            password_hash: Set(password_hash),
            created_at: Set(Utc::now()),
        };

        user.insert(&self.conn).await.map_err(Into::into)
    }

    /// Find user by ID
    pub async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(&self.conn)
            .await
            .map_err(Into::into)
    }

    /// Find user by email
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Email.eq(email))
            .one(&self.conn)
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Dataset Operations
    // ========================================================================

    /// Create a dataset in `processing` state with zeroed summary fields
    pub async fn create_dataset(&self, user_id: Uuid, filename: String) -> Result<Dataset> {
        let dataset = DatasetActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            filename: Set(filename),
            row_count: Set(0),
            rows_dropped: Set(0),
            date_min: Set(None),
            date_max: Set(None),
            total_sales: Set(0.0),
            status: Set(DatasetStatus::Processing.into()),
            created_at: Set(Utc::now()),
        };

        dataset.insert(&self.conn).await.map_err(Into::into)
    }

    /// List a user's datasets, newest first
    pub async fn datasets_for_user(&self, user_id: Uuid) -> Result<Vec<Dataset>> {
        DatasetEntity::find()
            .filter(DatasetColumn::UserId.eq(user_id))
            .order_by_desc(DatasetColumn::CreatedAt)
            .all(&self.conn)
            .await
            .map_err(Into::into)
    }

    /// Find a dataset scoped to its owner.
    ///
    /// Returns `None` both when the dataset does not exist and when it is
    /// owned by someone else, so callers cannot probe for other users'
    /// data.
    pub async fn find_dataset_for_user(
        &self,
        dataset_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Dataset>> {
        DatasetEntity::find_by_id(dataset_id)
            .filter(DatasetColumn::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .map_err(Into::into)
    }

    /// Find a dataset by ID without ownership scoping (job-internal use)
    pub async fn find_dataset_by_id(&self, dataset_id: Uuid) -> Result<Option<Dataset>> {
        DatasetEntity::find_by_id(dataset_id)
            .one(&self.conn)
            .await
            .map_err(Into::into)
    }

    /// Delete a dataset and all of its records
    pub async fn delete_dataset(&self, dataset_id: Uuid) -> Result<()> {
        self.conn
            .transaction::<_, (), DbErr>(move |txn| {
                Box::pin(async move {
                    SalesRecordEntity::delete_many()
                        .filter(SalesRecordColumn::DatasetId.eq(dataset_id))
                        .exec(txn)
                        .await?;

                    DatasetEntity::delete_by_id(dataset_id).exec(txn).await?;

                    Ok(())
                })
            })
            .await
            .map_err(flatten_txn_err)
    }

    /// Persist a successful materialization: all canonical records plus the
    /// summary fields and the `ready` status, atomically.
    ///
    /// Returns `false` without writing anything when the dataset has been
    /// deleted since the job was enqueued.
    pub async fn persist_materialization(
        &self,
        dataset_id: Uuid,
        records: Vec<SalesRecordActiveModel>,
        summary: DatasetSummary,
    ) -> Result<bool> {
        self.conn
            .transaction::<_, bool, DbErr>(move |txn| {
                Box::pin(async move {
                    let Some(dataset) = DatasetEntity::find_by_id(dataset_id).one(txn).await?
                    else {
                        return Ok(false);
                    };

                    for chunk in records.chunks(INSERT_CHUNK) {
                        SalesRecordEntity::insert_many(chunk.to_vec())
                            .exec(txn)
                            .await?;
                    }

                    let mut active: DatasetActiveModel = dataset.into();
                    active.row_count = Set(summary.row_count);
                    active.rows_dropped = Set(summary.rows_dropped);
                    active.date_min = Set(summary.date_min);
                    active.date_max = Set(summary.date_max);
                    active.total_sales = Set(summary.total_sales);
                    active.status = Set(DatasetStatus::Ready.into());
                    active.update(txn).await?;

                    Ok(true)
                })
            })
            .await
            .map_err(flatten_txn_err)
    }

    /// Flip a dataset to `failed`, leaving its zeroed summary untouched.
    ///
    /// A no-op when the dataset has been deleted concurrently.
    pub async fn mark_dataset_failed(&self, dataset_id: Uuid) -> Result<()> {
        DatasetEntity::update_many()
            .col_expr(
                DatasetColumn::Status,
                Expr::value(String::from(DatasetStatus::Failed)),
            )
            .filter(DatasetColumn::Id.eq(dataset_id))
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    // ========================================================================
    // Sales Record Operations
    // ========================================================================

    /// All canonical records of a dataset in natural row order
    pub async fn records_for_dataset(&self, dataset_id: Uuid) -> Result<Vec<SalesRecord>> {
        SalesRecordEntity::find()
            .filter(SalesRecordColumn::DatasetId.eq(dataset_id))
            .order_by_asc(SalesRecordColumn::Id)
            .all(&self.conn)
            .await
            .map_err(Into::into)
    }
}

fn flatten_txn_err(err: TransactionError<DbErr>) -> AppError {
    match err {
        TransactionError::Connection(e) => AppError::Database(e),
        TransactionError::Transaction(e) => AppError::Database(e),
    }
}
