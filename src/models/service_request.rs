//! Service request entity model
//!
//! A routable unit of work derived from a classified intent, scoped to a
//! category and city. Created on the first qualifying intent in a
//! conversation; near-duplicates within the dedup window merge into the
//! existing row's payload instead of creating a new one. Never deleted by the
//! pipeline.

use chrono::{DateTime, Utc};
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum RequestStatus {
    #[sea_orm(string_value = "new")]
    New,
    #[sea_orm(string_value = "dispatched")]
    Dispatched,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "closed")]
    Closed,
}

/// Versioned request payload accumulated across conversation turns.
///
/// Known optional fields instead of an open JSON map; merging overwrites only
/// fields present in the newer turn and bumps the version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestPayload {
    #[serde(default)]
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_user_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RequestPayload {
    /// Merge a newer turn into this payload. Fields absent from `newer` are
    /// left untouched so earlier context is never lost.
    pub fn merge(&mut self, newer: RequestPayload) {
        if newer.last_user_message.is_some() {
            self.last_user_message = newer.last_user_message;
        }
        if newer.intent.is_some() {
            self.intent = newer.intent;
        }
        if newer.sub_intent.is_some() {
            self.sub_intent = newer.sub_intent;
        }
        if newer.city.is_some() {
            self.city = newer.city;
        }
        if newer.confidence.is_some() {
            self.confidence = newer.confidence;
        }
        if newer.updated_at.is_some() {
            self.updated_at = newer.updated_at;
        }
        self.version += 1;
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }

    /// Parse a stored payload, falling back to an empty record when the
    /// stored JSON predates the current shape.
    pub fn from_json(value: &JsonValue) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "service_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub category_id: Uuid,
    pub city_id: Uuid,
    pub lead_id: Option<Uuid>,

    /// Conversation the request was created from
    pub conversation_id: Uuid,

    #[sea_orm(column_type = "JsonBinary")]
    pub payload: JsonValue,

    pub status: RequestStatus,

    /// Stamped on first dispatch only
    pub dispatched_at: Option<DateTimeWithTimeZone>,

    /// Set exactly once, at first dispatch; never moved earlier
    pub sla_due_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(
        belongs_to = "super::city::Entity",
        from = "Column::CityId",
        to = "super::city::Column::Id"
    )]
    City,
    #[sea_orm(
        belongs_to = "super::conversation::Entity",
        from = "Column::ConversationId",
        to = "super::conversation::Column::Id"
    )]
    Conversation,
    #[sea_orm(has_many = "super::provider_dispatch::Entity")]
    ProviderDispatch,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::city::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::City.def()
    }
}

impl Related<super::conversation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Conversation.def()
    }
}

impl Related<super::provider_dispatch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProviderDispatch.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
