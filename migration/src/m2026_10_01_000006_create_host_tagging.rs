//! Migration to create the host_tagging association table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(HostTagging::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(HostTagging::HostId).integer().not_null())
                    .col(ColumnDef::new(HostTagging::TagName).string_len(255).not_null())
                    .primary_key(
                        Index::create()
                            .name("pk_host_tagging")
                            .col(HostTagging::HostId)
                            .col(HostTagging::TagName),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_host_tagging_host_id")
                            .from(HostTagging::Table, HostTagging::HostId)
                            .to(Hosts::Table, Hosts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_host_tagging_tag_name")
                            .from(HostTagging::Table, HostTagging::TagName)
                            .to(Tags::Table, Tags::Name)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Reverse lookup from tag to hosts
        manager
            .create_index(
                Index::create()
                    .name("idx_host_tagging_tag_name")
                    .table(HostTagging::Table)
                    .col(HostTagging::TagName)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_host_tagging_tag_name").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(HostTagging::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum HostTagging {
    Table,
    HostId,
    TagName,
}

#[derive(DeriveIden)]
enum Hosts {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Tags {
    Table,
    Name,
}
