//! Database migrations for the host inventory.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_10_01_000001_create_tenants;
mod m2026_10_01_000002_create_access_secrets;
mod m2026_10_01_000003_create_hosts;
mod m2026_10_01_000004_create_host_variables;
mod m2026_10_01_000005_create_tags;
mod m2026_10_01_000006_create_host_tagging;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_10_01_000001_create_tenants::Migration),
            Box::new(m2026_10_01_000002_create_access_secrets::Migration),
            Box::new(m2026_10_01_000003_create_hosts::Migration),
            Box::new(m2026_10_01_000004_create_host_variables::Migration),
            Box::new(m2026_10_01_000005_create_tags::Migration),
            Box::new(m2026_10_01_000006_create_host_tagging::Migration),
        ]
    }
}
