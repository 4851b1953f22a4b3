//! Database migrations for the concierge intake service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_12_01_000100_create_leads;
mod m2025_12_01_000200_create_provider_users;
mod m2025_12_01_000300_create_taxonomy;
mod m2025_12_01_000400_create_conversations;
mod m2025_12_01_000500_create_webhook_events;
mod m2025_12_01_000600_create_messages;
mod m2025_12_01_000700_create_service_requests;
mod m2025_12_01_000800_create_provider_profiles;
mod m2025_12_01_000900_create_provider_dispatches;
mod m2025_12_01_001000_create_provider_contexts;
mod m2025_12_01_001100_create_cache_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_12_01_000100_create_leads::Migration),
            Box::new(m2025_12_01_000200_create_provider_users::Migration),
            Box::new(m2025_12_01_000300_create_taxonomy::Migration),
            Box::new(m2025_12_01_000400_create_conversations::Migration),
            Box::new(m2025_12_01_000500_create_webhook_events::Migration),
            Box::new(m2025_12_01_000600_create_messages::Migration),
            Box::new(m2025_12_01_000700_create_service_requests::Migration),
            Box::new(m2025_12_01_000800_create_provider_profiles::Migration),
            Box::new(m2025_12_01_000900_create_provider_dispatches::Migration),
            Box::new(m2025_12_01_001000_create_provider_contexts::Migration),
            Box::new(m2025_12_01_001100_create_cache_tables::Migration),
        ]
    }
}
