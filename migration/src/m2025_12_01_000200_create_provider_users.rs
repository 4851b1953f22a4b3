//! Migration to create the provider_users table.
//!
//! Provider users are the people behind service-provider profiles; dispatch
//! eligibility requires both the profile and its owning user to be active.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProviderUsers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProviderUsers::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProviderUsers::DisplayName).text().not_null())
                    .col(ColumnDef::new(ProviderUsers::Phone).text().null())
                    .col(
                        ColumnDef::new(ProviderUsers::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ProviderUsers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProviderUsers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProviderUsers {
    Table,
    Id,
    DisplayName,
    Phone,
    IsActive,
    CreatedAt,
}
