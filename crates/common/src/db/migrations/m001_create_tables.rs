use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Users::Email)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::PasswordHash).text().not_null())
                    .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Create datasets table
        manager
            .create_table(
                Table::create()
                    .table(Datasets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Datasets::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Datasets::UserId).uuid().not_null())
                    .col(ColumnDef::new(Datasets::Filename).text().not_null())
                    .col(
                        ColumnDef::new(Datasets::RowCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Datasets::RowsDropped)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Datasets::DateMin).timestamp())
                    .col(ColumnDef::new(Datasets::DateMax).timestamp())
                    .col(
                        ColumnDef::new(Datasets::TotalSales)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Datasets::Status)
                            .text()
                            .not_null()
                            .default("processing"),
                    )
                    .col(ColumnDef::new(Datasets::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_datasets_user_id")
                            .from(Datasets::Table, Datasets::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_datasets_user_id")
                    .table(Datasets::Table)
                    .col(Datasets::UserId)
                    .to_owned(),
            )
            .await?;

        // Create sales_records table
        manager
            .create_table(
                Table::create()
                    .table(SalesRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SalesRecords::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SalesRecords::DatasetId).uuid().not_null())
                    .col(
                        ColumnDef::new(SalesRecords::OrderNumber)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesRecords::QuantityOrdered)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SalesRecords::PriceEach).double().not_null())
                    .col(ColumnDef::new(SalesRecords::Sales).double().not_null())
                    .col(
                        ColumnDef::new(SalesRecords::OrderDate)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SalesRecords::Status).text().not_null())
                    .col(ColumnDef::new(SalesRecords::MonthId).integer().not_null())
                    .col(ColumnDef::new(SalesRecords::YearId).integer().not_null())
                    .col(ColumnDef::new(SalesRecords::ProductLine).text().not_null())
                    .col(ColumnDef::new(SalesRecords::ProductCode).text().not_null())
                    .col(
                        ColumnDef::new(SalesRecords::CustomerName)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SalesRecords::Country).text().not_null())
                    .col(ColumnDef::new(SalesRecords::DealSize).text().not_null())
                    .col(
                        ColumnDef::new(SalesRecords::TotalSales)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesRecords::OrderQuarter)
                            .text()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sales_records_dataset_id")
                            .from(SalesRecords::Table, SalesRecords::DatasetId)
                            .to(Datasets::Table, Datasets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sales_records_dataset_id")
                    .table(SalesRecords::Table)
                    .col(SalesRecords::DatasetId)
                    .to_owned(),
            )
            .await?;

        // Same order + product is the same line item within a dataset
        manager
            .create_index(
                Index::create()
                    .name("uq_sales_records_dataset_order_product")
                    .table(SalesRecords::Table)
                    .col(SalesRecords::DatasetId)
                    .col(SalesRecords::OrderNumber)
                    .col(SalesRecords::ProductCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SalesRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Datasets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    PasswordHash,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Datasets {
    Table,
    Id,
    UserId,
    Filename,
    RowCount,
    RowsDropped,
    DateMin,
    DateMax,
    TotalSales,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SalesRecords {
    Table,
    Id,
    DatasetId,
    OrderNumber,
    QuantityOrdered,
    PriceEach,
    Sales,
    OrderDate,
    Status,
    MonthId,
    YearId,
    ProductLine,
    ProductCode,
    CustomerName,
    Country,
    DealSize,
    TotalSales,
    OrderQuarter,
}
