//! Database infrastructure for Flightline Billing
//!
//! This crate owns everything PostgreSQL: connection pooling, schema
//! migrations, error mapping, and the [`PgBillingStore`] adapter that
//! implements the `domain_billing` store port over real transactions
//! with row-level locking.

pub mod error;
pub mod pool;
pub mod store;

pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, DatabaseConfig, DatabasePool};
pub use store::PgBillingStore;

/// Runs pending schema migrations against the given pool
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), DatabaseError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
}
