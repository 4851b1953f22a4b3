//! # Dispatch Repository
//!
//! The dispatch primitive: idempotent upsert of a (request, provider) send
//! record through the unique pair index. The update branch is a no-op
//! re-affirmation and never regresses a later status, so retries are safe at
//! any point.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::error::is_unique_violation;
use crate::models::provider_dispatch::{
    ActiveModel, Column, Entity as ProviderDispatch, Model,
};

pub struct DispatchRepository {
    db: DatabaseConnection,
}

impl DispatchRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Record that `provider_user_id` was notified about `request_id`.
    /// Returns the row and whether this call created it.
    pub async fn upsert_sent(
        &self,
        request_id: Uuid,
        provider_user_id: Uuid,
    ) -> Result<(Model, bool), DbErr> {
        let now = Utc::now().fixed_offset();
        let dispatch = ActiveModel {
            id: Set(Uuid::new_v4()),
            request_id: Set(request_id),
            provider_user_id: Set(provider_user_id),
            status: Set("sent".to_string()),
            sent_at: Set(now),
            created_at: Set(now),
        };

        match dispatch.insert(&self.db).await {
            Ok(created) => Ok((created, true)),
            Err(err) if is_unique_violation(&err) => {
                let existing = self
                    .find_pair(request_id, provider_user_id)
                    .await?
                    .ok_or(DbErr::RecordNotFound(format!(
                        "dispatch request={request_id} provider={provider_user_id}"
                    )))?;
                Ok((existing, false))
            }
            Err(err) => Err(err),
        }
    }

    pub async fn find_pair(
        &self,
        request_id: Uuid,
        provider_user_id: Uuid,
    ) -> Result<Option<Model>, DbErr> {
        ProviderDispatch::find()
            .filter(Column::RequestId.eq(request_id))
            .filter(Column::ProviderUserId.eq(provider_user_id))
            .one(&self.db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::init_pool;
    use crate::models::service_request::RequestPayload;
    use crate::repositories::{ConversationRepository, ServiceRequestRepository, TaxonomyRepository};
    use migration::{Migrator, MigratorTrait};
    use sea_orm::PaginatorTrait;

    async fn setup() -> (DatabaseConnection, Uuid, Uuid) {
        let db = init_pool(&AppConfig::test_config())
            .await
            .expect("Failed to init test DB");
        Migrator::up(&db, None).await.expect("migrations failed");

        let conversation = ConversationRepository::new(db.clone())
            .resolve_inbound("whatsapp", "+8613800000043", None, None, None)
            .await
            .unwrap();
        let category = TaxonomyRepository::new(db.clone())
            .find_or_create_category("hotel")
            .await
            .unwrap();

        let city = crate::models::city::ActiveModel {
            id: Set(Uuid::new_v4()),
            slug: Set("guangzhou".to_string()),
            display_name: Set("Guangzhou".to_string()),
            is_active: Set(true),
            is_default: Set(false),
            created_at: Set(Utc::now().into()),
        };
        let city = city.insert(&db).await.unwrap();

        let request = ServiceRequestRepository::new(db.clone())
            .create(
                conversation.id,
                category.id,
                city.id,
                None,
                RequestPayload::default(),
            )
            .await
            .unwrap();

        let user = crate::models::provider_user::ActiveModel {
            id: Set(Uuid::new_v4()),
            display_name: Set("Hotel Desk".to_string()),
            phone: Set(None),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        };
        let user = user.insert(&db).await.unwrap();

        (db, request.id, user.id)
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let (db, request_id, provider_id) = setup().await;
        let repo = DispatchRepository::new(db.clone());

        let (first, created) = repo.upsert_sent(request_id, provider_id).await.unwrap();
        assert!(created);
        assert_eq!(first.status, "sent");

        let (second, created_again) = repo.upsert_sent(request_id, provider_id).await.unwrap();
        assert!(!created_again);
        assert_eq!(second.id, first.id);
        assert_eq!(second.sent_at, first.sent_at);

        let count = ProviderDispatch::find().count(&db).await.unwrap();
        assert_eq!(count, 1);
    }
}
