//! # Provider Repository
//!
//! Eligibility queries over provider profiles and their owning users. The
//! category membership check lives in Rust (profiles carry a JSON array of
//! keys), so queries fetch the active set and filter; provider counts are
//! operator-scale, not customer-scale.

use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::models::provider_profile::{
    Column as ProfileColumn, Entity as ProviderProfile, Model as ProfileModel,
};
use crate::models::provider_user::{
    Column as UserColumn, Entity as ProviderUser, Model as UserModel,
};

/// An eligible provider: profile plus its owning user.
#[derive(Debug, Clone)]
pub struct EligibleProvider {
    pub profile: ProfileModel,
    pub user: UserModel,
}

pub struct ProviderRepository {
    db: DatabaseConnection,
}

impl ProviderRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Providers eligible to receive a dispatch for `category_key` in
    /// `city_id`: active profile, active owning user, category served, and
    /// city scope either unset (any city) or matching.
    ///
    /// Ordering is deterministic: `is_default` profiles first, then ascending
    /// user id, so identical eligible sets always select identically.
    pub async fn eligible_for_dispatch(
        &self,
        category_key: &str,
        city_id: Uuid,
    ) -> Result<Vec<EligibleProvider>, DbErr> {
        let mut eligible: Vec<EligibleProvider> = self
            .active_profiles()
            .await?
            .into_iter()
            .filter(|candidate| candidate.profile.serves_category(category_key))
            .filter(|candidate| match candidate.profile.city_id {
                None => true,
                Some(scope) => scope == city_id,
            })
            .collect();

        eligible.sort_by(|a, b| {
            b.profile
                .is_default
                .cmp(&a.profile.is_default)
                .then(a.user.id.cmp(&b.user.id))
        });

        Ok(eligible)
    }

    /// First provider eligible for conversation assignment in profile
    /// creation order, regardless of city.
    pub async fn first_for_assignment(
        &self,
        category_key: &str,
    ) -> Result<Option<EligibleProvider>, DbErr> {
        Ok(self
            .active_profiles()
            .await?
            .into_iter()
            .find(|candidate| candidate.profile.serves_category(category_key)))
    }

    /// Active profiles joined with active owning users, in profile creation
    /// order.
    async fn active_profiles(&self) -> Result<Vec<EligibleProvider>, DbErr> {
        let rows = ProviderProfile::find()
            .filter(ProfileColumn::IsActive.eq(true))
            .find_also_related(ProviderUser)
            .filter(UserColumn::IsActive.eq(true))
            .order_by_asc(ProfileColumn::CreatedAt)
            .order_by_asc(ProfileColumn::Id)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(profile, user)| user.map(|user| EligibleProvider { profile, user }))
            .collect())
    }
}
