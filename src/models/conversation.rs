//! Conversation entity model
//!
//! The durable thread identity tying a sequence of inbound/outbound messages
//! to one customer contact on one channel. Owned exclusively by the pipeline;
//! the unique external_thread_key guarantees at most one row per logical
//! thread.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Automation mode for a conversation.
///
/// HUMAN is terminal for the pipeline: once set, no further classification,
/// assignment, or AI reply generation runs for the thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ConversationMode {
    #[sea_orm(string_value = "AI")]
    Ai,
    #[sea_orm(string_value = "HUMAN")]
    Human,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "conversations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Originating channel ("whatsapp" or "webchat")
    pub channel: String,

    /// Deterministic thread key, unique across all conversations
    pub external_thread_key: String,

    pub mode: ConversationMode,

    pub lead_id: Option<Uuid>,

    /// Category key set by the assignment engine ("ops_queue" when routed to operators)
    pub category_key: Option<String>,

    pub assigned_provider_id: Option<Uuid>,
    pub assigned_at: Option<DateTimeWithTimeZone>,
    pub assigned_by: Option<String>,

    pub last_inbound_at: Option<DateTimeWithTimeZone>,
    pub last_outbound_at: Option<DateTimeWithTimeZone>,

    /// First 160 chars of the most recent inbound text
    pub last_message_preview: Option<String>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::lead::Entity",
        from = "Column::LeadId",
        to = "super::lead::Column::Id"
    )]
    Lead,
    #[sea_orm(has_many = "super::message::Entity")]
    Message,
    #[sea_orm(has_many = "super::service_request::Entity")]
    ServiceRequest,
}

impl Related<super::lead::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lead.def()
    }
}

impl Related<super::message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Message.def()
    }
}

impl Related<super::service_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ServiceRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
