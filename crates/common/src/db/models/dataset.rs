//! Dataset entity - one uploaded file's processing lifecycle and summary

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Dataset processing status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetStatus {
    Processing,
    Ready,
    Failed,
}

impl From<String> for DatasetStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ready" => DatasetStatus::Ready,
            "failed" => DatasetStatus::Failed,
            _ => DatasetStatus::Processing,
        }
    }
}

impl From<DatasetStatus> for String {
    fn from(status: DatasetStatus) -> Self {
        match status {
            DatasetStatus::Processing => "processing".to_string(),
            DatasetStatus::Ready => "ready".to_string(),
            DatasetStatus::Failed => "failed".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "datasets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub filename: String,

    /// Canonical records written (0 until the job finishes)
    pub row_count: i64,

    /// Rows removed by deduplication
    pub rows_dropped: i64,

    /// Earliest order date across the dataset's records
    pub date_min: Option<DateTimeUtc>,

    /// Latest order date across the dataset's records
    pub date_max: Option<DateTimeUtc>,

    /// Sum of derived total_sales across the dataset's records
    pub total_sales: f64,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub created_at: DateTimeUtc,
}

impl Model {
    /// Get the dataset status as an enum
    pub fn dataset_status(&self) -> DatasetStatus {
        DatasetStatus::from(self.status.clone())
    }

    /// Check if the dataset is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.dataset_status(),
            DatasetStatus::Ready | DatasetStatus::Failed
        )
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,

    #[sea_orm(has_many = "super::sales_record::Entity")]
    SalesRecords,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::sales_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalesRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            DatasetStatus::Processing,
            DatasetStatus::Ready,
            DatasetStatus::Failed,
        ] {
            let s: String = status.into();
            assert_eq!(DatasetStatus::from(s), status);
        }
    }

    #[test]
    fn test_unknown_status_defaults_to_processing() {
        assert_eq!(
            DatasetStatus::from("garbage".to_string()),
            DatasetStatus::Processing
        );
    }
}
