//! Migration to create the response-cache tables.
//!
//! search_cache rows are keyed by a canonical hash of the request shape and
//! deleted once expired; catalog_items are keyed by the upstream external id
//! and kept in place after expiry as stale reference history.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SearchCache::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SearchCache::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SearchCache::CacheKey).text().not_null())
                    .col(
                        ColumnDef::new(SearchCache::Results)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SearchCache::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SearchCache::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SearchCache::UpdatedAt)
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
                    .name("idx_search_cache_key")
                    .table(SearchCache::Table)
                    .col(SearchCache::CacheKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CatalogItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CatalogItems::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CatalogItems::ExternalId).text().not_null())
                    .col(ColumnDef::new(CatalogItems::Name).text().not_null())
                    .col(
                        ColumnDef::new(CatalogItems::Payload)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CatalogItems::LastSyncedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CatalogItems::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CatalogItems::CreatedAt)
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
                    .name("idx_catalog_items_external_id")
                    .table(CatalogItems::Table)
                    .col(CatalogItems::ExternalId)
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
                    .name("idx_catalog_items_external_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(CatalogItems::Table).to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_search_cache_key").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SearchCache::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SearchCache {
    Table,
    Id,
    CacheKey,
    Results,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CatalogItems {
    Table,
    Id,
    ExternalId,
    Name,
    Payload,
    LastSyncedAt,
    ExpiresAt,
    CreatedAt,
}
