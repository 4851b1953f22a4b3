//! # Response Cache
//!
//! TTL-keyed store for expensive external lookups. Search results are keyed
//! by a canonical hash of the request shape so semantically identical queries
//! always hit the same row; catalog items are keyed by their upstream
//! external id. No single-flight protection: concurrent misses for the same
//! key each recompute and upsert independently, and the last write wins.

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    ModelTrait, QueryFilter, Set,
};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use crate::error::is_unique_violation;
use crate::models::catalog_item::{
    ActiveModel as CatalogActiveModel, Column as CatalogColumn, Entity as CatalogItem,
    Model as CatalogModel,
};
use crate::models::search_cache::{
    ActiveModel as SearchActiveModel, Column as SearchColumn, Entity as SearchCache,
};

/// TTL for search result entries.
pub const SEARCH_TTL_MINUTES: i64 = 15;

/// TTL for individual catalog items.
pub const CATALOG_TTL_HOURS: i64 = 24;

/// Canonical cache key over a request shape: object keys are sorted
/// recursively before hashing, so field order never changes the key.
pub fn cache_key(kind: &str, params: &JsonValue) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    hasher.update(b"|");
    hasher.update(canonical_string(params).as_bytes());
    hex::encode(hasher.finalize())
}

fn canonical_string(value: &JsonValue) -> String {
    match value {
        JsonValue::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|key| format!("{}:{}", key, canonical_string(&map[key])))
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        JsonValue::Array(items) => {
            let fields: Vec<String> = items.iter().map(canonical_string).collect();
            format!("[{}]", fields.join(","))
        }
        scalar => scalar.to_string(),
    }
}

/// Persistent store for search-result cache entries.
pub struct SearchCacheStore {
    db: DatabaseConnection,
}

impl SearchCacheStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Read a cached result. An expired row counts as a miss and is deleted
    /// on detection.
    pub async fn get(&self, key: &str) -> Result<Option<JsonValue>, DbErr> {
        let Some(entry) = SearchCache::find()
            .filter(SearchColumn::CacheKey.eq(key))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        if Utc::now().fixed_offset() > entry.expires_at {
            debug!(cache_key = %key, "Expired search cache entry removed");
            entry.delete(&self.db).await?;
            return Ok(None);
        }

        Ok(Some(entry.results))
    }

    /// Upsert a result under the key. Every write resets the TTL.
    pub async fn put(&self, key: &str, results: JsonValue) -> Result<(), DbErr> {
        let now = Utc::now();
        let expires_at = (now + Duration::minutes(SEARCH_TTL_MINUTES)).fixed_offset();

        if let Some(existing) = SearchCache::find()
            .filter(SearchColumn::CacheKey.eq(key))
            .one(&self.db)
            .await?
        {
            let mut active = existing.into_active_model();
            active.results = Set(results);
            active.expires_at = Set(expires_at);
            active.updated_at = Set(now.fixed_offset());
            active.update(&self.db).await?;
            return Ok(());
        }

        let entry = SearchActiveModel {
            id: Set(Uuid::new_v4()),
            cache_key: Set(key.to_string()),
            results: Set(results.clone()),
            expires_at: Set(expires_at),
            created_at: Set(now.fixed_offset()),
            updated_at: Set(now.fixed_offset()),
        };

        match entry.insert(&self.db).await {
            Ok(_) => Ok(()),
            // Concurrent writer got there first; take the update branch
            Err(err) if is_unique_violation(&err) => {
                if let Some(existing) = SearchCache::find()
                    .filter(SearchColumn::CacheKey.eq(key))
                    .one(&self.db)
                    .await?
                {
                    let mut active = existing.into_active_model();
                    active.results = Set(results);
                    active.expires_at = Set(expires_at);
                    active.updated_at = Set(now.fixed_offset());
                    active.update(&self.db).await?;
                }
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

/// Persistent store for catalog-item cache entries.
pub struct CatalogCacheStore {
    db: DatabaseConnection,
}

impl CatalogCacheStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Read a catalog item. Expired rows are left in place as stale reference
    /// history and simply not returned.
    pub async fn get(&self, external_id: &str) -> Result<Option<CatalogModel>, DbErr> {
        let Some(item) = CatalogItem::find()
            .filter(CatalogColumn::ExternalId.eq(external_id))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        if Utc::now().fixed_offset() > item.expires_at {
            return Ok(None);
        }

        Ok(Some(item))
    }

    /// Upsert a catalog item by external id, resetting sync time and TTL.
    pub async fn upsert(
        &self,
        external_id: &str,
        name: &str,
        payload: JsonValue,
    ) -> Result<CatalogModel, DbErr> {
        let now = Utc::now();
        let expires_at = (now + Duration::hours(CATALOG_TTL_HOURS)).fixed_offset();

        if let Some(existing) = CatalogItem::find()
            .filter(CatalogColumn::ExternalId.eq(external_id))
            .one(&self.db)
            .await?
        {
            let mut active = existing.into_active_model();
            active.name = Set(name.to_string());
            active.payload = Set(payload);
            active.last_synced_at = Set(now.fixed_offset());
            active.expires_at = Set(expires_at);
            return active.update(&self.db).await;
        }

        let item = CatalogActiveModel {
            id: Set(Uuid::new_v4()),
            external_id: Set(external_id.to_string()),
            name: Set(name.to_string()),
            payload: Set(payload.clone()),
            last_synced_at: Set(now.fixed_offset()),
            expires_at: Set(expires_at),
            created_at: Set(now.fixed_offset()),
        };

        match item.insert(&self.db).await {
            Ok(created) => Ok(created),
            Err(err) if is_unique_violation(&err) => {
                let existing = CatalogItem::find()
                    .filter(CatalogColumn::ExternalId.eq(external_id))
                    .one(&self.db)
                    .await?
                    .ok_or(DbErr::RecordNotFound(format!(
                        "catalog item external_id={external_id}"
                    )))?;
                let mut active = existing.into_active_model();
                active.name = Set(name.to_string());
                active.payload = Set(payload);
                active.last_synced_at = Set(now.fixed_offset());
                active.expires_at = Set(expires_at);
                active.update(&self.db).await
            }
            Err(err) => Err(err),
        }
    }
}
