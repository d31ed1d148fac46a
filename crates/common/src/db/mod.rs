//! Database layer for SalesForge
//!
//! Provides:
//! - SeaORM entity models
//! - Repository pattern for data access
//! - Connection management and schema migrations
//! - Test utilities (in-memory SQLite)

pub mod migrations;
pub mod models;
mod repository;
pub mod test_utils;

pub use repository::{DatasetSummary, Repository};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// Establish a database connection from configuration
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    info!("Connecting to database...");

    let mut opts = ConnectOptions::new(&config.url);
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(false);

    let conn = Database::connect(opts)
        .await
        .map_err(|e| AppError::DatabaseConnection {
            message: format!("Failed to connect: {}", e),
        })?;

    info!("Database connection established");

    Ok(conn)
}

/// Apply pending schema migrations
pub async fn migrate(conn: &DatabaseConnection) -> Result<()> {
    use sea_orm_migration::MigratorTrait;

    migrations::Migrator::up(conn, None).await?;
    Ok(())
}

/// Ping the database to check connectivity
pub async fn ping(conn: &DatabaseConnection) -> Result<()> {
    use sea_orm::ConnectionTrait;

    conn.execute_unprepared("SELECT 1")
        .await
        .map_err(|e| AppError::DatabaseConnection {
            message: format!("Ping failed: {}", e),
        })?;

    Ok(())
}
