//! # Message Repository
//!
//! Append-only message log. Inbound rows are written during ingestion,
//! outbound rows when a reply is handed to the channel sender; the status
//! callback webhook is the only writer of delivery-status updates.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::message::{ActiveModel, Column, Entity as Message, MessageDirection, Model};

pub struct MessageRepository {
    db: DatabaseConnection,
}

impl MessageRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Append an inbound customer message.
    pub async fn record_inbound(
        &self,
        conversation_id: Uuid,
        content: &str,
        provider_message_id: Option<&str>,
        attachments: JsonValue,
    ) -> Result<Model, DbErr> {
        let message = ActiveModel {
            id: Set(Uuid::new_v4()),
            conversation_id: Set(conversation_id),
            role: Set("user".to_string()),
            direction: Set(MessageDirection::Inbound),
            provider_message_id: Set(provider_message_id.map(str::to_string)),
            content: Set(content.to_string()),
            status: Set("received".to_string()),
            attachments: Set(attachments),
            created_at: Set(Utc::now().into()),
        };

        message.insert(&self.db).await
    }

    /// Append an outbound automated reply.
    pub async fn record_outbound(
        &self,
        conversation_id: Uuid,
        content: &str,
        provider_message_id: Option<&str>,
        status: &str,
    ) -> Result<Model, DbErr> {
        let message = ActiveModel {
            id: Set(Uuid::new_v4()),
            conversation_id: Set(conversation_id),
            role: Set("assistant".to_string()),
            direction: Set(MessageDirection::Outbound),
            provider_message_id: Set(provider_message_id.map(str::to_string)),
            content: Set(content.to_string()),
            status: Set(status.to_string()),
            attachments: Set(JsonValue::Array(Vec::new())),
            created_at: Set(Utc::now().into()),
        };

        message.insert(&self.db).await
    }

    /// Update delivery status from a provider status callback. Returns the
    /// updated row, or `None` when no message carries the provider id (stale
    /// or foreign callback, not an error).
    pub async fn update_delivery_status(
        &self,
        provider_message_id: &str,
        status: &str,
    ) -> Result<Option<Model>, DbErr> {
        let Some(message) = Message::find()
            .filter(Column::ProviderMessageId.eq(provider_message_id))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let mut active = message.into_active_model();
        active.status = Set(status.to_string());
        Ok(Some(active.update(&self.db).await?))
    }

    /// All messages of a conversation in chronological order.
    pub async fn list_for_conversation(&self, conversation_id: Uuid) -> Result<Vec<Model>, DbErr> {
        Message::find()
            .filter(Column::ConversationId.eq(conversation_id))
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
    }
}
