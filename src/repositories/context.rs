//! # Provider Context Repository

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, Set};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::provider_context::{ActiveModel, Model};

pub struct ContextRepository {
    db: DatabaseConnection,
}

impl ContextRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Persist a synthesized provider context row, returning its id.
    pub async fn create(
        &self,
        request_id: Uuid,
        english_message: &str,
        extracted_summary: Option<&str>,
        extracted_payload: JsonValue,
        created_by: &str,
    ) -> Result<Model, DbErr> {
        let context = ActiveModel {
            id: Set(Uuid::new_v4()),
            request_id: Set(request_id),
            english_message: Set(english_message.to_string()),
            extracted_summary: Set(extracted_summary.map(str::to_string)),
            extracted_payload: Set(extracted_payload),
            created_by: Set(created_by.to_string()),
            created_at: Set(Utc::now().into()),
        };

        context.insert(&self.db).await
    }
}
