//! Provider dispatch entity model
//!
//! The record that a specific provider has been notified about a specific
//! service request. Unique on (request_id, provider_user_id); upsert is the
//! dispatch primitive and the update branch never regresses a later status.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "provider_dispatches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub request_id: Uuid,
    pub provider_user_id: Uuid,

    /// "sent" on creation; later statuses are owned by operator tooling
    pub status: String,

    pub sent_at: DateTimeWithTimeZone,

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
    #[sea_orm(
        belongs_to = "super::provider_user::Entity",
        from = "Column::ProviderUserId",
        to = "super::provider_user::Column::Id"
    )]
    ProviderUser,
}

impl Related<super::service_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ServiceRequest.def()
    }
}

impl Related<super::provider_user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProviderUser.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
