//! Message entity model
//!
//! Append-only message log per conversation. Rows are immutable once written
//! except for the delivery status, which the status callback webhook updates.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum MessageDirection {
    #[sea_orm(string_value = "INBOUND")]
    Inbound,
    #[sea_orm(string_value = "OUTBOUND")]
    Outbound,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub conversation_id: Uuid,

    /// "user" for customer messages, "assistant" for automated replies
    pub role: String,

    pub direction: MessageDirection,

    /// Provider-assigned id; set on inbound deliveries and on accepted sends
    pub provider_message_id: Option<String>,

    pub content: String,

    /// Delivery status ("received", "queued", "sent", "delivered", "failed")
    pub status: String,

    /// Media attachments as a JSON array of {url, content_type}
    #[sea_orm(column_type = "JsonBinary")]
    pub attachments: JsonValue,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::conversation::Entity",
        from = "Column::ConversationId",
        to = "super::conversation::Column::Id"
    )]
    Conversation,
}

impl Related<super::conversation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Conversation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
