//! Migration to create the provider_profiles table.
//!
//! One profile per provider user. The categories column holds a JSON array
//! of category keys the provider serves; a null city means any city.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProviderProfiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProviderProfiles::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProviderProfiles::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(ProviderProfiles::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ProviderProfiles::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(ProviderProfiles::CityId).uuid().null())
                    .col(
                        ColumnDef::new(ProviderProfiles::Categories)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProviderProfiles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_provider_profiles_user_id")
                            .from(ProviderProfiles::Table, ProviderProfiles::UserId)
                            .to(ProviderUsers::Table, ProviderUsers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_provider_profiles_city_id")
                            .from(ProviderProfiles::Table, ProviderProfiles::CityId)
                            .to(Cities::Table, Cities::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_provider_profiles_user_id")
                    .table(ProviderProfiles::Table)
                    .col(ProviderProfiles::UserId)
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
                    .name("idx_provider_profiles_user_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ProviderProfiles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProviderProfiles {
    Table,
    Id,
    UserId,
    IsActive,
    IsDefault,
    CityId,
    Categories,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ProviderUsers {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Cities {
    Table,
    Id,
}
