//! # Lead Repository
//!
//! Leads are looked up by phone and created on first contact. Creation races
//! between two concurrent deliveries for the same new contact resolve through
//! the unique phone index.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::error::is_unique_violation;
use crate::models::lead::{ActiveModel, Column, Entity as Lead, Model};

pub struct LeadRepository {
    db: DatabaseConnection,
}

impl LeadRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Find the lead for a phone number, creating it on first contact.
    pub async fn find_or_create(
        &self,
        phone: &str,
        name: Option<&str>,
        whatsapp_handle: Option<&str>,
    ) -> Result<Model, DbErr> {
        if let Some(existing) = self.find_by_phone(phone).await? {
            return Ok(existing);
        }

        let now = Utc::now().fixed_offset();
        let lead = ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.map(str::to_string)),
            phone: Set(phone.to_string()),
            whatsapp_handle: Set(whatsapp_handle.map(str::to_string)),
            email: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match lead.insert(&self.db).await {
            Ok(created) => Ok(created),
            // Lost the creation race; the other writer's row is authoritative
            Err(err) if is_unique_violation(&err) => self
                .find_by_phone(phone)
                .await?
                .ok_or(DbErr::RecordNotFound(format!("lead phone={phone}"))),
            Err(err) => Err(err),
        }
    }

    pub async fn find_by_phone(&self, phone: &str) -> Result<Option<Model>, DbErr> {
        Lead::find()
            .filter(Column::Phone.eq(phone))
            .one(&self.db)
            .await
    }
}
