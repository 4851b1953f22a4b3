//! # Assignment Engine
//!
//! Maps a classified intent to a category and, when confidence clears the
//! per-category threshold, assigns the conversation to the first eligible
//! provider in profile creation order. Idempotent per turn: a conversation
//! that is already assigned, or already in HUMAN mode, is never touched.

use sea_orm::{DatabaseConnection, DbErr};
use tracing::{debug, info};

use crate::clients::IntentResult;
use crate::config::{OPS_QUEUE, RoutingConfig};
use crate::models::conversation::{ConversationMode, Model as Conversation};
use crate::repositories::{ConversationRepository, ProviderRepository};

/// Marker recorded on conversations assigned by the engine.
const ASSIGNED_BY_AI: &str = "AI";

pub struct AssignmentEngine {
    conversations: ConversationRepository,
    providers: ProviderRepository,
    routing: RoutingConfig,
}

impl AssignmentEngine {
    pub fn new(db: DatabaseConnection, routing: RoutingConfig) -> Self {
        Self {
            conversations: ConversationRepository::new(db.clone()),
            providers: ProviderRepository::new(db),
            routing,
        }
    }

    /// Classify the conversation's category and maybe assign a provider.
    /// Safe to call on every turn.
    pub async fn classify_and_maybe_assign(
        &self,
        conversation: Conversation,
        intent: &IntentResult,
    ) -> Result<Conversation, DbErr> {
        if conversation.assigned_provider_id.is_some()
            || conversation.mode == ConversationMode::Human
        {
            debug!(
                conversation_id = %conversation.id,
                "Conversation already assigned or human-handled; skipping"
            );
            return Ok(conversation);
        }

        let Some(category_key) = self.routing.category_for_intent(&intent.intent) else {
            debug!(
                conversation_id = %conversation.id,
                intent = %intent.intent,
                "No category mapping for intent; routing to ops queue"
            );
            return self.conversations.set_category(conversation, OPS_QUEUE).await;
        };
        let category_key = category_key.to_string();

        let threshold = self.routing.threshold(&category_key);
        if intent.confidence < threshold {
            debug!(
                conversation_id = %conversation.id,
                category = %category_key,
                confidence = intent.confidence,
                threshold,
                "Confidence below threshold; routing to ops queue"
            );
            return self.conversations.set_category(conversation, OPS_QUEUE).await;
        }

        match self.providers.first_for_assignment(&category_key).await? {
            Some(provider) => {
                info!(
                    conversation_id = %conversation.id,
                    category = %category_key,
                    provider_user_id = %provider.user.id,
                    "Assigning conversation to provider"
                );
                self.conversations
                    .assign_provider(conversation, &category_key, provider.user.id, ASSIGNED_BY_AI)
                    .await
            }
            None => {
                // Category is known but nobody serves it; record the category
                // and leave the thread unassigned for operators
                self.conversations
                    .set_category(conversation, &category_key)
                    .await
            }
        }
    }
}
