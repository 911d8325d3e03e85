//! # Host Inventory Main Entry Point
//!
//! Operator CLI for the host inventory: schema migrations, a database health
//! check, and host lookup by characteristic.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use host_inventory::{
    config::ConfigLoader,
    db::{health_check, init_pool},
    migration::{Migrator, MigratorTrait},
    models::Describe,
    repositories::HostRepository,
    telemetry::init_tracing,
};
use sea_orm::DatabaseConnection;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "inventory", version, about = "Multi-tenant host inventory")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply, revert or list schema migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Check database connectivity
    Health,
    /// List hosts whose variable `key` equals `value`
    Hosts {
        #[arg(long)]
        key: String,
        /// JSON value; bare words are treated as strings
        #[arg(long)]
        value: String,
        #[arg(long)]
        tenant: Option<Uuid>,
    },
}

#[derive(Debug, Subcommand)]
enum MigrateAction {
    Up,
    /// Revert the most recent migration
    Down,
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration from layered env files and variables
    let config = ConfigLoader::new()
        .load()
        .context("Failed to load configuration")?;
    init_tracing(&config).context("Failed to initialize tracing")?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    let db = init_pool(&config).await?;

    match cli.command {
        Command::Migrate { action } => migrate(&db, action).await,
        Command::Health => {
            health_check(&db).await?;
            println!("ok");
            Ok(())
        }
        Command::Hosts { key, value, tenant } => list_hosts(&db, &key, &value, tenant).await,
    }
}

async fn migrate(db: &DatabaseConnection, action: MigrateAction) -> Result<()> {
    match action {
        MigrateAction::Up => {
            Migrator::up(db, None)
                .await
                .context("Failed to apply migrations")?;
            tracing::info!("Migrations applied");
        }
        MigrateAction::Down => {
            Migrator::down(db, Some(1))
                .await
                .context("Failed to revert migration")?;
            tracing::info!("Latest migration reverted");
        }
        MigrateAction::Status => {
            for migration in Migrator::get_applied_migrations(db).await? {
                println!("applied  {}", migration.name());
            }
            for migration in Migrator::get_pending_migrations(db).await? {
                println!("pending  {}", migration.name());
            }
        }
    }
    Ok(())
}

async fn list_hosts(
    db: &DatabaseConnection,
    key: &str,
    raw_value: &str,
    tenant: Option<Uuid>,
) -> Result<()> {
    let value = serde_json::from_str(raw_value)
        .unwrap_or_else(|_| JsonValue::String(raw_value.to_string()));

    let hosts = HostRepository::new(db);
    let matches = match tenant {
        Some(tenant_id) => {
            hosts
                .with_characteristic_in_tenant(tenant_id, key, &value)
                .await?
        }
        None => hosts.with_characteristic(key, &value).await?,
    };

    for host in &matches {
        println!("{}\t{}\t{}", host.describe(), host.ip_address, host.tenant_id);
    }
    tracing::info!(key, matches = matches.len(), "Host lookup finished");

    Ok(())
}
