//! Migration to create the hosts table.
//!
//! Hostnames and IP addresses are unique per tenant. The IP address is an
//! `INET` on Postgres; SQLite has no network type and stores the canonical
//! textual form instead.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut ip_address = ColumnDef::new(Hosts::IpAddress);
        match manager.get_database_backend() {
            DatabaseBackend::Postgres => ip_address.inet(),
            _ => ip_address.string_len(45),
        };
        ip_address.not_null();

        manager
            .create_table(
                Table::create()
                    .table(Hosts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Hosts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Hosts::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Hosts::AccessSecretId).integer().null())
                    .col(ColumnDef::new(Hosts::Hostname).string_len(255).not_null())
                    .col(&mut ip_address)
                    .col(
                        ColumnDef::new(Hosts::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Hosts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Hosts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_hosts_tenant_id")
                            .from(Hosts::Table, Hosts::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::NoAction),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_hosts_access_secret_id")
                            .from(Hosts::Table, Hosts::AccessSecretId)
                            .to(AccessSecrets::Table, AccessSecrets::Id)
                            .on_delete(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_hosts_tenant_hostname")
                    .table(Hosts::Table)
                    .col(Hosts::TenantId)
                    .col(Hosts::Hostname)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_hosts_tenant_ip_address")
                    .table(Hosts::Table)
                    .col(Hosts::TenantId)
                    .col(Hosts::IpAddress)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_hosts_tenant_id")
                    .table(Hosts::Table)
                    .col(Hosts::TenantId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for index in [
            "idx_hosts_tenant_hostname",
            "idx_hosts_tenant_ip_address",
            "idx_hosts_tenant_id",
        ] {
            manager
                .drop_index(Index::drop().name(index).to_owned())
                .await?;
        }

        manager
            .drop_table(Table::drop().table(Hosts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Hosts {
    Table,
    Id,
    TenantId,
    AccessSecretId,
    Hostname,
    IpAddress,
    Active,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum AccessSecrets {
    Table,
    Id,
}
