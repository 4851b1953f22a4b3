//! Catalog item entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Cached copy of an upstream catalog item, keyed by the upstream external
/// id. Expired rows stay in place as stale reference history and are simply
/// not returned from reads.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "catalog_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub external_id: String,

    pub name: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub payload: JsonValue,

    pub last_synced_at: DateTimeWithTimeZone,
    pub expires_at: DateTimeWithTimeZone,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
