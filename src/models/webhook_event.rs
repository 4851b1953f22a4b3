//! Webhook event entity model
//!
//! One row per inbound delivery attempt. The unique provider_message_id is
//! the idempotency boundary for the whole pipeline: a constraint violation on
//! insert means the delivery has already been processed.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "webhook_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Delivery kind (e.g. "inbound_message", "status_callback", "webchat_message")
    pub event_type: String,

    /// Provider-assigned delivery id, globally unique
    pub provider_message_id: String,

    /// Raw payload as received, for replay and debugging
    #[sea_orm(column_type = "JsonBinary")]
    pub raw_payload: JsonValue,

    pub received_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
