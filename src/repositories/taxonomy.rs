//! # Taxonomy Repository
//!
//! Category and city resolution for service requests. Categories are created
//! lazily on first use; cities are operator-provisioned and resolved with a
//! fallback chain: explicit city from the classifier, configured default,
//! default-flagged row, any active city.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use uuid::Uuid;

use crate::error::is_unique_violation;
use crate::models::category::{
    ActiveModel as CategoryActiveModel, Column as CategoryColumn, Entity as Category,
    Model as CategoryModel,
};
use crate::models::city::{Column as CityColumn, Entity as City, Model as CityModel};

pub struct TaxonomyRepository {
    db: DatabaseConnection,
}

impl TaxonomyRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Find a category by key, creating the row on first use.
    pub async fn find_or_create_category(&self, key: &str) -> Result<CategoryModel, DbErr> {
        if let Some(existing) = self.find_category(key).await? {
            return Ok(existing);
        }

        let category = CategoryActiveModel {
            id: Set(Uuid::new_v4()),
            key: Set(key.to_string()),
            display_name: Set(display_name_for(key)),
            created_at: Set(Utc::now().into()),
        };

        match category.insert(&self.db).await {
            Ok(created) => Ok(created),
            Err(err) if is_unique_violation(&err) => self
                .find_category(key)
                .await?
                .ok_or(DbErr::RecordNotFound(format!("category key={key}"))),
            Err(err) => Err(err),
        }
    }

    pub async fn find_category(&self, key: &str) -> Result<Option<CategoryModel>, DbErr> {
        Category::find()
            .filter(CategoryColumn::Key.eq(key))
            .one(&self.db)
            .await
    }

    /// Resolve the city a request is scoped to. Returns `None` only when no
    /// active city exists at all, in which case the request is not created.
    pub async fn resolve_city(
        &self,
        explicit_slug: Option<&str>,
        configured_default: Option<&str>,
    ) -> Result<Option<CityModel>, DbErr> {
        if let Some(slug) = explicit_slug {
            if let Some(city) = self.find_active_city(slug).await? {
                return Ok(Some(city));
            }
        }

        if let Some(slug) = configured_default {
            if let Some(city) = self.find_active_city(slug).await? {
                return Ok(Some(city));
            }
        }

        if let Some(city) = City::find()
            .filter(CityColumn::IsActive.eq(true))
            .filter(CityColumn::IsDefault.eq(true))
            .one(&self.db)
            .await?
        {
            return Ok(Some(city));
        }

        City::find()
            .filter(CityColumn::IsActive.eq(true))
            .order_by_asc(CityColumn::CreatedAt)
            .one(&self.db)
            .await
    }

    async fn find_active_city(&self, slug: &str) -> Result<Option<CityModel>, DbErr> {
        City::find()
            .filter(CityColumn::Slug.eq(slug))
            .filter(CityColumn::IsActive.eq(true))
            .one(&self.db)
            .await
    }
}

fn display_name_for(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
