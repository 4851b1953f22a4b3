//! Provider profile entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Routing profile for one provider user: which categories they serve and in
/// which city (null city = any city). is_default providers sort first during
/// dispatch selection.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "provider_profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    pub is_active: bool,
    pub is_default: bool,

    pub city_id: Option<Uuid>,

    /// JSON array of category keys
    #[sea_orm(column_type = "JsonBinary")]
    pub categories: JsonValue,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Whether this profile serves the given category key.
    pub fn serves_category(&self, key: &str) -> bool {
        self.categories
            .as_array()
            .map(|keys| keys.iter().any(|k| k.as_str() == Some(key)))
            .unwrap_or(false)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::provider_user::Entity",
        from = "Column::UserId",
        to = "super::provider_user::Column::Id"
    )]
    ProviderUser,
    #[sea_orm(
        belongs_to = "super::city::Entity",
        from = "Column::CityId",
        to = "super::city::Column::Id"
    )]
    City,
}

impl Related<super::provider_user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProviderUser.def()
    }
}

impl Related<super::city::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::City.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
