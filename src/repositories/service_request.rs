//! # Service Request Repository
//!
//! Creation, window-scoped dedup lookup, payload merge, and SLA stamping for
//! service requests. The window check is a read-then-write sequence with no
//! lock; two background chains racing for the same conversation can each
//! create a request, and the pipeline tolerates that rather than coordinate.

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::models::service_request::{
    ActiveModel, Column, Entity as ServiceRequest, Model, RequestPayload, RequestStatus,
};

/// Rolling dedup window. A fixed design constant, not configurable per
/// category.
pub const DEDUP_WINDOW_MINUTES: i64 = 20;

pub struct ServiceRequestRepository {
    db: DatabaseConnection,
}

impl ServiceRequestRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Most recent open request for the conversation+category created within
    /// the dedup window.
    pub async fn find_open_in_window(
        &self,
        conversation_id: Uuid,
        category_id: Uuid,
    ) -> Result<Option<Model>, DbErr> {
        let cutoff = Utc::now() - Duration::minutes(DEDUP_WINDOW_MINUTES);

        ServiceRequest::find()
            .filter(Column::ConversationId.eq(conversation_id))
            .filter(Column::CategoryId.eq(category_id))
            .filter(Column::CreatedAt.gte(cutoff))
            .filter(Column::Status.is_in([
                RequestStatus::New,
                RequestStatus::Dispatched,
                RequestStatus::Pending,
            ]))
            .order_by_desc(Column::CreatedAt)
            .one(&self.db)
            .await
    }

    /// Create a fresh request in status `new`.
    pub async fn create(
        &self,
        conversation_id: Uuid,
        category_id: Uuid,
        city_id: Uuid,
        lead_id: Option<Uuid>,
        payload: RequestPayload,
    ) -> Result<Model, DbErr> {
        let now = Utc::now().fixed_offset();
        let request = ActiveModel {
            id: Set(Uuid::new_v4()),
            category_id: Set(category_id),
            city_id: Set(city_id),
            lead_id: Set(lead_id),
            conversation_id: Set(conversation_id),
            payload: Set(payload.to_json()),
            status: Set(RequestStatus::New),
            dispatched_at: Set(None),
            sla_due_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        request.insert(&self.db).await
    }

    /// Merge a newer turn into an existing request's payload. No new dispatch
    /// is triggered by a merge.
    pub async fn merge_payload(
        &self,
        request: Model,
        newer: RequestPayload,
    ) -> Result<Model, DbErr> {
        let mut payload = RequestPayload::from_json(&request.payload);
        payload.merge(newer);

        let mut active = request.into_active_model();
        active.payload = Set(payload.to_json());
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(&self.db).await
    }

    /// Stamp dispatch bookkeeping. `dispatched_at` and `sla_due_at` are set
    /// on the first dispatch only and never moved afterwards.
    pub async fn mark_dispatched(
        &self,
        request: Model,
        sla_minutes: i64,
    ) -> Result<Model, DbErr> {
        let first_dispatch = request.dispatched_at.is_none();
        let now = Utc::now().fixed_offset();

        let mut active = request.into_active_model();
        active.status = Set(RequestStatus::Dispatched);
        if first_dispatch {
            active.dispatched_at = Set(Some(now));
            active.sla_due_at = Set(Some(now + Duration::minutes(sla_minutes)));
        }
        active.updated_at = Set(now);
        active.update(&self.db).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::init_pool;
    use crate::repositories::{ConversationRepository, TaxonomyRepository};
    use migration::{Migrator, MigratorTrait};

    async fn setup() -> (DatabaseConnection, Uuid, Uuid, Uuid) {
        let db = init_pool(&AppConfig::test_config())
            .await
            .expect("Failed to init test DB");
        Migrator::up(&db, None).await.expect("migrations failed");

        let conversation = ConversationRepository::new(db.clone())
            .resolve_inbound("whatsapp", "+8613800000042", None, None, None)
            .await
            .unwrap();

        let taxonomy = TaxonomyRepository::new(db.clone());
        let category = taxonomy.find_or_create_category("hotel").await.unwrap();

        let city = crate::models::city::ActiveModel {
            id: Set(Uuid::new_v4()),
            slug: Set("guangzhou".to_string()),
            display_name: Set("Guangzhou".to_string()),
            is_active: Set(true),
            is_default: Set(true),
            created_at: Set(Utc::now().into()),
        };
        let city = city.insert(&db).await.unwrap();

        (db, conversation.id, category.id, city.id)
    }

    #[tokio::test]
    async fn test_window_hit_within_twenty_minutes() {
        let (db, conversation_id, category_id, city_id) = setup().await;
        let repo = ServiceRequestRepository::new(db);

        let created = repo
            .create(
                conversation_id,
                category_id,
                city_id,
                None,
                RequestPayload::default(),
            )
            .await
            .unwrap();

        let found = repo
            .find_open_in_window(conversation_id, category_id)
            .await
            .unwrap()
            .expect("request created just now should be inside the window");
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn test_window_hit_at_nineteen_minutes() {
        let (db, conversation_id, category_id, city_id) = setup().await;
        let repo = ServiceRequestRepository::new(db.clone());

        let created = repo
            .create(
                conversation_id,
                category_id,
                city_id,
                None,
                RequestPayload::default(),
            )
            .await
            .unwrap();

        let aged = Utc::now() - Duration::minutes(DEDUP_WINDOW_MINUTES - 1);
        let mut active = created.clone().into_active_model();
        active.created_at = Set(aged.fixed_offset());
        active.update(&db).await.unwrap();

        let found = repo
            .find_open_in_window(conversation_id, category_id)
            .await
            .unwrap()
            .expect("19-minute-old request is still inside the window");
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn test_window_miss_when_created_before_cutoff() {
        let (db, conversation_id, category_id, city_id) = setup().await;
        let repo = ServiceRequestRepository::new(db.clone());

        let created = repo
            .create(
                conversation_id,
                category_id,
                city_id,
                None,
                RequestPayload::default(),
            )
            .await
            .unwrap();

        // Age the row past the window (21 minutes)
        let stale = Utc::now() - Duration::minutes(DEDUP_WINDOW_MINUTES + 1);
        let mut active = created.into_active_model();
        active.created_at = Set(stale.fixed_offset());
        active.update(&db).await.unwrap();

        let found = repo
            .find_open_in_window(conversation_id, category_id)
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_window_ignores_closed_requests() {
        let (db, conversation_id, category_id, city_id) = setup().await;
        let repo = ServiceRequestRepository::new(db.clone());

        let created = repo
            .create(
                conversation_id,
                category_id,
                city_id,
                None,
                RequestPayload::default(),
            )
            .await
            .unwrap();

        let mut active = created.into_active_model();
        active.status = Set(RequestStatus::Closed);
        active.update(&db).await.unwrap();

        let found = repo
            .find_open_in_window(conversation_id, category_id)
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_merge_bumps_version_and_keeps_context() {
        let (db, conversation_id, category_id, city_id) = setup().await;
        let repo = ServiceRequestRepository::new(db);

        let created = repo
            .create(
                conversation_id,
                category_id,
                city_id,
                None,
                RequestPayload {
                    intent: Some("HOTEL".to_string()),
                    city: Some("guangzhou".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let merged = repo
            .merge_payload(
                created,
                RequestPayload {
                    last_user_message: Some("near the station please".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let payload = RequestPayload::from_json(&merged.payload);
        assert_eq!(payload.version, 1);
        assert_eq!(payload.intent.as_deref(), Some("HOTEL"));
        assert_eq!(
            payload.last_user_message.as_deref(),
            Some("near the station please")
        );
    }

    #[tokio::test]
    async fn test_sla_stamped_once() {
        let (db, conversation_id, category_id, city_id) = setup().await;
        let repo = ServiceRequestRepository::new(db);

        let created = repo
            .create(
                conversation_id,
                category_id,
                city_id,
                None,
                RequestPayload::default(),
            )
            .await
            .unwrap();

        let dispatched = repo.mark_dispatched(created, 30).await.unwrap();
        let first_due = dispatched.sla_due_at.expect("SLA set at first dispatch");
        let first_dispatched_at = dispatched.dispatched_at.unwrap();

        // Second dispatch pass must not move the deadline
        let redispatched = repo.mark_dispatched(dispatched, 30).await.unwrap();
        assert_eq!(redispatched.sla_due_at, Some(first_due));
        assert_eq!(redispatched.dispatched_at, Some(first_dispatched_at));
        assert_eq!(redispatched.status, RequestStatus::Dispatched);
    }
}
