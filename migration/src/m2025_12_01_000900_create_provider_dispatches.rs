//! Migration to create the provider_dispatches table.
//!
//! The unique (request_id, provider_user_id) pair is the dispatch idempotency
//! gate: re-dispatch attempts land on the update branch and never produce a
//! second logical send.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProviderDispatches::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProviderDispatches::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProviderDispatches::RequestId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProviderDispatches::ProviderUserId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProviderDispatches::Status)
                            .text()
                            .not_null()
                            .default("sent"),
                    )
                    .col(
                        ColumnDef::new(ProviderDispatches::SentAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProviderDispatches::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_provider_dispatches_request_id")
                            .from(ProviderDispatches::Table, ProviderDispatches::RequestId)
                            .to(ServiceRequests::Table, ServiceRequests::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_provider_dispatches_provider_user_id")
                            .from(
                                ProviderDispatches::Table,
                                ProviderDispatches::ProviderUserId,
                            )
                            .to(ProviderUsers::Table, ProviderUsers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_provider_dispatches_request_provider")
                    .table(ProviderDispatches::Table)
                    .col(ProviderDispatches::RequestId)
                    .col(ProviderDispatches::ProviderUserId)
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
                    .name("idx_provider_dispatches_request_provider")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ProviderDispatches::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProviderDispatches {
    Table,
    Id,
    RequestId,
    ProviderUserId,
    Status,
    SentAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ServiceRequests {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum ProviderUsers {
    Table,
    Id,
}
