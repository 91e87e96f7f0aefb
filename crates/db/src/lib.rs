//! Persistence for the process catalog: row models, the unit-of-work
//! contract, sqlx repositories and the Postgres and in-memory stores.

use sqlx::postgres::PgPoolOptions;

pub mod memory_store;
pub mod models;
pub mod pg_store;
pub mod repositories;
pub mod store;

pub use memory_store::InMemoryCatalogStore;
pub use pg_store::PgCatalogStore;
pub use store::{CatalogStore, CatalogTx, StoreError, StoreResult};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Run a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
