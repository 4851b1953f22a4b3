//! Migration to create the provider_contexts table.
//!
//! Best-effort derived context rows handed to providers alongside a
//! dispatched service request.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProviderContexts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProviderContexts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProviderContexts::RequestId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProviderContexts::EnglishMessage)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProviderContexts::ExtractedSummary)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProviderContexts::ExtractedPayload)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProviderContexts::CreatedBy)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProviderContexts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_provider_contexts_request_id")
                            .from(ProviderContexts::Table, ProviderContexts::RequestId)
                            .to(ServiceRequests::Table, ServiceRequests::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_provider_contexts_request_id")
                    .table(ProviderContexts::Table)
                    .col(ProviderContexts::RequestId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_provider_contexts_request_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ProviderContexts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProviderContexts {
    Table,
    Id,
    RequestId,
    EnglishMessage,
    ExtractedSummary,
    ExtractedPayload,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ServiceRequests {
    Table,
    Id,
}
