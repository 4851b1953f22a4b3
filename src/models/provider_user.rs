//! Provider user entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Person behind a service-provider profile. Dispatch eligibility requires
/// both the profile and its owning user to be active.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "provider_users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub display_name: String,

    /// Delivery target for dispatch notifications
    pub phone: Option<String>,

    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::provider_profile::Entity")]
    ProviderProfile,
    #[sea_orm(has_many = "super::provider_dispatch::Entity")]
    ProviderDispatch,
}

impl Related<super::provider_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProviderProfile.def()
    }
}

impl Related<super::provider_dispatch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProviderDispatch.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
