//! Test support: in-memory SQLite database with the full schema applied.
//!
//! Shared by the unit and integration tests of every crate in the
//! workspace; never used by production code paths.

use sea_orm::{ConnectOptions, Database, DatabaseConnection};

/// Create an in-memory SQLite database and run all migrations.
///
/// The pool is pinned to a single connection: every connection to
/// `sqlite::memory:` gets its own database, so a larger pool would hand
/// out blank databases.
pub async fn setup_test_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).sqlx_logging(false);

    let db = Database::connect(opts)
        .await
        .expect("Failed to connect to test database");

    use sea_orm_migration::MigratorTrait;
    crate::db::migrations::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}
