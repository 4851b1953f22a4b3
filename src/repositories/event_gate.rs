//! # Idempotent Event Gate
//!
//! Deduplicates inbound webhook deliveries using the unique constraint on
//! `webhook_events.provider_message_id`. This is the load-bearing idempotency
//! boundary for the whole pipeline: everything downstream may assume each
//! delivery id passes through at most once, even under at-least-once
//! transport retries.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, Set};
use serde_json::Value as JsonValue;
use tracing::debug;
use uuid::Uuid;

use crate::error::is_unique_violation;
use crate::models::webhook_event::ActiveModel;

/// Repository for webhook event admission.
pub struct EventGateRepository {
    db: DatabaseConnection,
}

impl EventGateRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Attempt to admit a delivery. Returns `false` when the delivery id was
    /// seen before; the caller must still acknowledge the transport without
    /// re-running side effects.
    pub async fn admit(
        &self,
        event_type: &str,
        provider_message_id: &str,
        raw_payload: JsonValue,
    ) -> Result<bool, DbErr> {
        let event = ActiveModel {
            id: Set(Uuid::new_v4()),
            event_type: Set(event_type.to_string()),
            provider_message_id: Set(provider_message_id.to_string()),
            raw_payload: Set(raw_payload),
            received_at: Set(Utc::now().into()),
        };

        match event.insert(&self.db).await {
            Ok(_) => Ok(true),
            Err(err) if is_unique_violation(&err) => {
                debug!(
                    provider_message_id = %provider_message_id,
                    "Duplicate delivery rejected by event gate"
                );
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }
}
