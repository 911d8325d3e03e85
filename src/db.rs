//! Database connection and transaction helpers.
//!
//! This module initializes the SeaORM connection pool used by the
//! repositories and provides the commit-or-rollback helper that scopes
//! multi-step mutations.

use anyhow::{Context, Result};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction,
    Statement, TransactionTrait,
};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::AppConfig;
use crate::error::RepositoryError;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {source}")]
    ConnectionFailed {
        #[from]
        source: sea_orm::DbErr,
    },
    #[error("Invalid database configuration: {message}")]
    InvalidConfiguration { message: String },
}

const MAX_CONNECT_ATTEMPTS: u32 = 5;

/// Initializes a database connection pool with the given configuration.
///
/// Connection attempts are retried with exponential backoff, starting at
/// 100ms. This only covers establishing the pool; inventory operations are
/// never retried.
///
/// # Examples
///
/// ```no_run
/// use host_inventory::{config::AppConfig, db::init_pool};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = AppConfig::default();
///     let db = init_pool(&config).await?;
///     // Use the database connection...
///     Ok(())
/// }
/// ```
pub async fn init_pool(cfg: &AppConfig) -> Result<DatabaseConnection> {
    if cfg.database_url.is_empty() {
        return Err(DatabaseError::InvalidConfiguration {
            message: "Database URL cannot be empty".to_string(),
        }
        .into());
    }

    let mut opt = ConnectOptions::new(&cfg.database_url);
    opt.max_connections(cfg.db_max_connections)
        .acquire_timeout(Duration::from_millis(cfg.db_acquire_timeout_ms))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let mut retry_delay = Duration::from_millis(100);
    let mut attempt = 1;

    loop {
        match Database::connect(opt.clone()).await {
            Ok(conn) => {
                tracing::info!(attempt, "Connected to database");
                return Ok(conn);
            }
            Err(e) if attempt >= MAX_CONNECT_ATTEMPTS => {
                tracing::error!(
                    attempts = MAX_CONNECT_ATTEMPTS,
                    error = %e,
                    "Failed to connect to database"
                );
                return Err(DatabaseError::ConnectionFailed { source: e }.into());
            }
            Err(e) => {
                tracing::warn!(
                    attempt,
                    error = %e,
                    retry_in_ms = retry_delay.as_millis() as u64,
                    "Database connection attempt failed, retrying"
                );

                sleep(retry_delay).await;
                retry_delay *= 2;
                attempt += 1;
            }
        }
    }
}

/// Health check for the database connection.
pub async fn health_check(db: &DatabaseConnection) -> Result<()> {
    let stmt = Statement::from_string(db.get_database_backend(), "SELECT 1".to_string());

    db.query_one(stmt)
        .await
        .context("Database health check failed")?;

    Ok(())
}

/// Opens a transaction on `db` (a savepoint when `db` is itself a transaction).
pub async fn begin<C>(db: &C) -> Result<DatabaseTransaction, RepositoryError>
where
    C: TransactionTrait,
{
    db.begin().await.map_err(RepositoryError::database_error)
}

/// Commits `txn` when `result` is `Ok` and rolls it back otherwise, so other
/// callers never observe a partially applied mutation.
pub async fn finish<T>(
    txn: DatabaseTransaction,
    result: Result<T, RepositoryError>,
) -> Result<T, RepositoryError> {
    match result {
        Ok(value) => {
            txn.commit()
                .await
                .map_err(RepositoryError::database_error)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::error!(error = %rollback_err, "Failed to roll back transaction");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_database_url() {
        let config = AppConfig {
            database_url: "".to_string(),
            ..Default::default()
        };

        let result = init_pool(&config).await;

        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err().downcast::<DatabaseError>(),
            Ok(DatabaseError::InvalidConfiguration { .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_database_fails_after_retries() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let config = AppConfig {
            database_url: format!(
                "sqlite://{}?mode=rwc",
                dir.path().join("missing").join("inventory.db").display()
            ),
            db_max_connections: 1,
            ..Default::default()
        };

        let err = init_pool(&config).await.expect_err("parent directory is missing");
        assert!(matches!(
            err.downcast::<DatabaseError>(),
            Ok(DatabaseError::ConnectionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn connects_and_checks_sqlite_memory() {
        let config = AppConfig {
            database_url: "sqlite::memory:".to_string(),
            db_max_connections: 1,
            ..Default::default()
        };

        let db = init_pool(&config).await.expect("sqlite pool");
        health_check(&db).await.expect("healthy");
    }
}
