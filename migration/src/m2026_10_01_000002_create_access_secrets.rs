//! Migration to create the access_secrets table.
//!
//! An access secret holds an opaque certificate blob and may be shared by
//! several hosts of the same tenant.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AccessSecrets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccessSecrets::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AccessSecrets::TenantId).uuid().not_null())
                    .col(ColumnDef::new(AccessSecrets::Cert).text().null())
                    .col(
                        ColumnDef::new(AccessSecrets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(AccessSecrets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_access_secrets_tenant_id")
                            .from(AccessSecrets::Table, AccessSecrets::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_access_secrets_tenant_id")
                    .table(AccessSecrets::Table)
                    .col(AccessSecrets::TenantId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_access_secrets_tenant_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(AccessSecrets::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AccessSecrets {
    Table,
    Id,
    TenantId,
    Cert,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}
