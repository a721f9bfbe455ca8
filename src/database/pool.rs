use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;

use crate::config;

/// Errors from the record store adapter
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Build the application pool. Connections are established lazily so the
/// process can start before the database is reachable.
pub fn connect() -> Result<PgPool, DatabaseError> {
    let database = &config::config().database;

    let pool = PgPoolOptions::new()
        .max_connections(database.max_connections)
        .acquire_timeout(Duration::from_secs(database.connect_timeout_secs))
        .connect_lazy(&database.url)?;

    Ok(pool)
}

/// Pings the store to ensure connectivity
pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
