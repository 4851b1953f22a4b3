//! # Thread Resolver
//!
//! Maps a channel-specific sender/session identity to a stable conversation
//! record. The thread key is a pure function of channel + identity, and the
//! unique index on it guarantees at most one conversation per logical thread:
//! all continuity of chat history and intent context hangs off this mapping.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, Set,
};
use uuid::Uuid;

use crate::error::is_unique_violation;
use crate::models::conversation::{
    ActiveModel, Column, ConversationMode, Entity as Conversation, Model,
};

/// Longest preview stored on the conversation row.
const PREVIEW_MAX_CHARS: usize = 160;

/// Deterministic thread key for a channel identity.
///
/// An authenticated user on a UI-driven channel keys by user id so the thread
/// follows them across sessions; everything else keys by the raw session or
/// phone identity.
pub fn thread_key(channel: &str, identity: &str, authenticated_user: Option<Uuid>) -> String {
    match authenticated_user {
        Some(user_id) => format!("{channel}:user:{user_id}"),
        None => format!("{channel}:{identity}"),
    }
}

fn preview_of(text: &str) -> String {
    text.chars().take(PREVIEW_MAX_CHARS).collect()
}

pub struct ConversationRepository {
    db: DatabaseConnection,
}

impl ConversationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Resolve the conversation for an inbound contact, creating it on first
    /// contact and updating the inbound bookkeeping on repeat contact.
    pub async fn resolve_inbound(
        &self,
        channel: &str,
        identity: &str,
        authenticated_user: Option<Uuid>,
        lead_id: Option<Uuid>,
        message_text: Option<&str>,
    ) -> Result<Model, DbErr> {
        let key = thread_key(channel, identity, authenticated_user);
        let now = Utc::now().fixed_offset();

        if let Some(existing) = self.find_by_key(&key).await? {
            let missing_lead = existing.lead_id.is_none();
            let mut active = existing.into_active_model();
            active.last_inbound_at = Set(Some(now));
            if let Some(text) = message_text {
                active.last_message_preview = Set(Some(preview_of(text)));
            }
            if missing_lead && lead_id.is_some() {
                active.lead_id = Set(lead_id);
            }
            active.updated_at = Set(now);
            return active.update(&self.db).await;
        }

        let conversation = ActiveModel {
            id: Set(Uuid::new_v4()),
            channel: Set(channel.to_string()),
            external_thread_key: Set(key.clone()),
            mode: Set(ConversationMode::Ai),
            lead_id: Set(lead_id),
            category_key: Set(None),
            assigned_provider_id: Set(None),
            assigned_at: Set(None),
            assigned_by: Set(None),
            last_inbound_at: Set(Some(now)),
            last_outbound_at: Set(None),
            last_message_preview: Set(message_text.map(preview_of)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match conversation.insert(&self.db).await {
            Ok(created) => Ok(created),
            // Concurrent first contact on the same thread: the unique key
            // decided a winner, fetch it
            Err(err) if is_unique_violation(&err) => self
                .find_by_key(&key)
                .await?
                .ok_or(DbErr::RecordNotFound(format!("conversation key={key}"))),
            Err(err) => Err(err),
        }
    }

    /// Update inbound bookkeeping on an already-resolved conversation
    /// (webchat path, where the caller addresses the thread by id).
    pub async fn touch_inbound(
        &self,
        conversation: Model,
        message_text: Option<&str>,
    ) -> Result<Model, DbErr> {
        let now = Utc::now().fixed_offset();
        let mut active = conversation.into_active_model();
        active.last_inbound_at = Set(Some(now));
        if let Some(text) = message_text {
            active.last_message_preview = Set(Some(preview_of(text)));
        }
        active.updated_at = Set(now);
        active.update(&self.db).await
    }

    pub async fn find_by_key(&self, key: &str) -> Result<Option<Model>, DbErr> {
        Conversation::find()
            .filter(Column::ExternalThreadKey.eq(key))
            .one(&self.db)
            .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Model>, DbErr> {
        Conversation::find_by_id(id).one(&self.db).await
    }

    /// Flip the conversation to HUMAN mode. Terminal for the pipeline.
    pub async fn mark_human(&self, conversation: Model) -> Result<Model, DbErr> {
        let mut active = conversation.into_active_model();
        active.mode = Set(ConversationMode::Human);
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(&self.db).await
    }

    /// Record the category chosen by the assignment engine.
    pub async fn set_category(&self, conversation: Model, key: &str) -> Result<Model, DbErr> {
        let mut active = conversation.into_active_model();
        active.category_key = Set(Some(key.to_string()));
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(&self.db).await
    }

    /// Record an AI assignment to a specific provider.
    pub async fn assign_provider(
        &self,
        conversation: Model,
        category_key: &str,
        provider_user_id: Uuid,
        assigned_by: &str,
    ) -> Result<Model, DbErr> {
        let now = Utc::now().fixed_offset();
        let mut active = conversation.into_active_model();
        active.category_key = Set(Some(category_key.to_string()));
        active.assigned_provider_id = Set(Some(provider_user_id));
        active.assigned_at = Set(Some(now));
        active.assigned_by = Set(Some(assigned_by.to_string()));
        active.updated_at = Set(now);
        active.update(&self.db).await
    }

    /// Update outbound bookkeeping after a reply is recorded.
    pub async fn touch_outbound(&self, conversation_id: Uuid) -> Result<(), DbErr> {
        let Some(conversation) = self.find_by_id(conversation_id).await? else {
            return Ok(());
        };
        let now = Utc::now().fixed_offset();
        let mut active = conversation.into_active_model();
        active.last_outbound_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(&self.db).await?;
        Ok(())
    }
}
