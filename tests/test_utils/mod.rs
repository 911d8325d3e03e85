//! Test utilities for database testing.
//!
//! This module provides utilities for setting up in-memory SQLite databases
//! with migrations applied and foreign keys enforced.

use anyhow::Result;
use host_inventory::models::{access_secret, host, tenant};
use host_inventory::repositories::{
    AccessSecretRepository, HostRepository, NewAccessSecret, NewHost, NewTenant,
    TenantRepository,
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

/// Sets up an in-memory SQLite database with all migrations applied.
///
/// The pool holds a single connection so every query sees the same
/// in-memory database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(opt).await?;

    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA foreign_keys = ON".to_string(),
    ))
    .await?;

    Migrator::up(&db, None).await?;

    Ok(db)
}

/// Creates a named test tenant.
#[allow(dead_code)]
pub async fn create_test_tenant(db: &DatabaseConnection, name: &str) -> Result<tenant::Model> {
    let tenant = TenantRepository::new(db)
        .create(NewTenant {
            id: None,
            name: Some(name.to_string()),
        })
        .await?;
    Ok(tenant)
}

/// Creates an active host without an access secret.
#[allow(dead_code)]
pub async fn create_test_host(
    db: &DatabaseConnection,
    tenant_id: Uuid,
    hostname: &str,
    ip_address: &str,
) -> Result<host::Model> {
    let host = HostRepository::new(db)
        .create(NewHost {
            tenant_id,
            hostname: hostname.to_string(),
            ip_address: ip_address.parse()?,
            access_secret_id: None,
            active: None,
        })
        .await?;
    Ok(host)
}

/// Creates an access secret holding a dummy certificate.
#[allow(dead_code)]
pub async fn create_test_secret(
    db: &DatabaseConnection,
    tenant_id: Uuid,
) -> Result<access_secret::Model> {
    let secret = AccessSecretRepository::new(db)
        .create(NewAccessSecret {
            tenant_id,
            cert: Some("-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----".to_string()),
        })
        .await?;
    Ok(secret)
}
