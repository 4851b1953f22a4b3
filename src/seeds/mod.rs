//! Database seeding functionality
//!
//! This module provides functionality to seed the database with routing
//! targets: cities, categories, and provider users with their profiles.
//! Seeding is idempotent; rows that already exist (by slug, key, or phone)
//! are left untouched.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{city, provider_profile, provider_user};
use crate::repositories::TaxonomyRepository;

/// Declarative seed file shape.
#[derive(Debug, Deserialize)]
pub struct SeedSpec {
    #[serde(default)]
    pub cities: Vec<CitySeed>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub providers: Vec<ProviderSeed>,
}

#[derive(Debug, Deserialize)]
pub struct CitySeed {
    pub slug: String,
    pub display_name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProviderSeed {
    pub display_name: String,
    pub phone: Option<String>,
    /// Category keys this provider serves
    pub categories: Vec<String>,
    /// City slug scope; absent means any city
    pub city: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

fn default_true() -> bool {
    true
}

/// Apply a seed spec. Returns the number of rows created.
pub async fn apply(db: &DatabaseConnection, spec: SeedSpec) -> Result<usize> {
    let mut created = 0usize;
    let taxonomy = TaxonomyRepository::new(db.clone());

    for seed in &spec.cities {
        let existing = city::Entity::find()
            .filter(city::Column::Slug.eq(&seed.slug))
            .one(db)
            .await?;
        if existing.is_some() {
            log::info!("City '{}' already exists, skipping", seed.slug);
            continue;
        }

        let row = city::ActiveModel {
            id: Set(Uuid::new_v4()),
            slug: Set(seed.slug.clone()),
            display_name: Set(seed.display_name.clone()),
            is_active: Set(seed.is_active),
            is_default: Set(seed.is_default),
            created_at: Set(Utc::now().into()),
        };
        row.insert(db).await?;
        log::info!("Created city: {}", seed.slug);
        created += 1;
    }

    for key in &spec.categories {
        if taxonomy.find_category(key).await?.is_none() {
            taxonomy.find_or_create_category(key).await?;
            log::info!("Created category: {}", key);
            created += 1;
        }
    }

    for seed in &spec.providers {
        let city_id = match &seed.city {
            Some(slug) => {
                let Some(city) = city::Entity::find()
                    .filter(city::Column::Slug.eq(slug))
                    .one(db)
                    .await?
                else {
                    log::warn!(
                        "Provider '{}' references unknown city '{}', skipping",
                        seed.display_name,
                        slug
                    );
                    continue;
                };
                Some(city.id)
            }
            None => None,
        };

        if let Some(phone) = &seed.phone {
            let existing = provider_user::Entity::find()
                .filter(provider_user::Column::Phone.eq(phone))
                .one(db)
                .await?;
            if existing.is_some() {
                log::info!("Provider '{}' already exists, skipping", seed.display_name);
                continue;
            }
        }

        let user = provider_user::ActiveModel {
            id: Set(Uuid::new_v4()),
            display_name: Set(seed.display_name.clone()),
            phone: Set(seed.phone.clone()),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        };
        let user = user.insert(db).await?;

        let profile = provider_profile::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            is_active: Set(true),
            is_default: Set(seed.is_default),
            city_id: Set(city_id),
            categories: Set(serde_json::json!(seed.categories)),
            created_at: Set(Utc::now().into()),
        };
        profile.insert(db).await?;

        log::info!("Created provider: {}", seed.display_name);
        created += 1;
    }

    Ok(created)
}
