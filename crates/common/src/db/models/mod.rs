//! SeaORM entity models
//!
//! Database entities for SalesForge

mod dataset;
mod sales_record;
mod user;

pub use user::{
    ActiveModel as UserActiveModel, Column as UserColumn, Entity as UserEntity, Model as User,
};

pub use dataset::{
    ActiveModel as DatasetActiveModel, Column as DatasetColumn, DatasetStatus,
    Entity as DatasetEntity, Model as Dataset,
};

pub use sales_record::{
    ActiveModel as SalesRecordActiveModel, Column as SalesRecordColumn,
    Entity as SalesRecordEntity, Model as SalesRecord,
};
