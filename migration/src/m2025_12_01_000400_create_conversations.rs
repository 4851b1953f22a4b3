//! Migration to create the conversations table.
//!
//! A conversation is the durable thread identity for one customer contact on
//! one channel. The unique external_thread_key guarantees at most one row per
//! logical thread and is the anchor for the thread resolver upsert.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Conversations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Conversations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Conversations::Channel).text().not_null())
                    .col(
                        ColumnDef::new(Conversations::ExternalThreadKey)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Conversations::Mode)
                            .text()
                            .not_null()
                            .default("AI"),
                    )
                    .col(ColumnDef::new(Conversations::LeadId).uuid().null())
                    .col(ColumnDef::new(Conversations::CategoryKey).text().null())
                    .col(
                        ColumnDef::new(Conversations::AssignedProviderId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Conversations::AssignedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Conversations::AssignedBy).text().null())
                    .col(
                        ColumnDef::new(Conversations::LastInboundAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Conversations::LastOutboundAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Conversations::LastMessagePreview)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Conversations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Conversations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_conversations_lead_id")
                            .from(Conversations::Table, Conversations::LeadId)
                            .to(Leads::Table, Leads::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_conversations_thread_key")
                    .table(Conversations::Table)
                    .col(Conversations::ExternalThreadKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_conversations_thread_key")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Conversations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Conversations {
    Table,
    Id,
    Channel,
    ExternalThreadKey,
    Mode,
    LeadId,
    CategoryKey,
    AssignedProviderId,
    AssignedAt,
    AssignedBy,
    LastInboundAt,
    LastOutboundAt,
    LastMessagePreview,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Leads {
    Table,
    Id,
}
