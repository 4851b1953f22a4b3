//! Migration to create the categories and cities tables.
//!
//! Categories are created lazily on first use by the request deduplicator;
//! cities are provisioned by operators (seed binary) and carry the
//! default-city fallback used during request routing.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::Key).text().not_null())
                    .col(ColumnDef::new(Categories::DisplayName).text().not_null())
                    .col(
                        ColumnDef::new(Categories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_categories_key")
                    .table(Categories::Table)
                    .col(Categories::Key)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Cities::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Cities::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Cities::Slug).text().not_null())
                    .col(ColumnDef::new(Cities::DisplayName).text().not_null())
                    .col(
                        ColumnDef::new(Cities::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Cities::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Cities::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cities_slug")
                    .table(Cities::Table)
                    .col(Cities::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_cities_slug").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Cities::Table).to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_categories_key").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    Key,
    DisplayName,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Cities {
    Table,
    Id,
    Slug,
    DisplayName,
    IsActive,
    IsDefault,
    CreatedAt,
}
