//! Sales record entity - one normalized sales-order line item
//!
//! The auto-increment primary key defines the datastore's natural row
//! order; records are always fetched ordered by it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub dataset_id: Uuid,

    pub order_number: i64,

    pub quantity_ordered: i64,

    pub price_each: f64,

    /// Revenue figure as reported in the source file; may disagree with
    /// quantity * price
    pub sales: f64,

    pub order_date: DateTimeUtc,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub month_id: i32,

    pub year_id: i32,

    #[sea_orm(column_type = "Text")]
    pub product_line: String,

    #[sea_orm(column_type = "Text")]
    pub product_code: String,

    #[sea_orm(column_type = "Text")]
    pub customer_name: String,

    #[sea_orm(column_type = "Text")]
    pub country: String,

    #[sea_orm(column_type = "Text")]
    pub deal_size: String,

    /// Derived revenue: quantity_ordered * price_each, the authoritative
    /// figure for all aggregates
    pub total_sales: f64,

    /// Q1-Q4, derived from the order date's month
    #[sea_orm(column_type = "Text")]
    pub order_quarter: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::dataset::Entity",
        from = "Column::DatasetId",
        to = "super::dataset::Column::Id"
    )]
    Dataset,
}

impl Related<super::dataset::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Dataset.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
