//! Provider message context entity model
//!
//! Best-effort derived context for a dispatched request: the customer message
//! translated to English plus a short structured summary. Synthesis failures
//! never block the row; the original text is persisted unchanged.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "provider_contexts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub request_id: Uuid,

    /// Customer message in English (original text if translation failed)
    pub english_message: String,

    /// 2-3 sentence summary, absent when summarization failed
    pub extracted_summary: Option<String>,

    #[sea_orm(column_type = "JsonBinary")]
    pub extracted_payload: JsonValue,

    /// Producer tag ("synthesizer")
    pub created_by: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::service_request::Entity",
        from = "Column::RequestId",
        to = "super::service_request::Column::Id"
    )]
    ServiceRequest,
}

impl Related<super::service_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ServiceRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
