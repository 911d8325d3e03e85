//! Migration to create the host_variables table.
//!
//! Each row is one key/value binding for one host. Bindings are removed
//! together with their host.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(HostVariables::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(HostVariables::HostId).integer().not_null())
                    .col(ColumnDef::new(HostVariables::Key).string_len(255).not_null())
                    .col(ColumnDef::new(HostVariables::Value).json().null())
                    .col(
                        ColumnDef::new(HostVariables::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(HostVariables::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_host_variables")
                            .col(HostVariables::HostId)
                            .col(HostVariables::Key),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_host_variables_host_id")
                            .from(HostVariables::Table, HostVariables::HostId)
                            .to(Hosts::Table, Hosts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Supports with_characteristic lookups by key
        manager
            .create_index(
                Index::create()
                    .name("idx_host_variables_key")
                    .table(HostVariables::Table)
                    .col(HostVariables::Key)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_host_variables_key").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(HostVariables::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum HostVariables {
    Table,
    HostId,
    Key,
    Value,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Hosts {
    Table,
    Id,
}
