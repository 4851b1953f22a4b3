//! # Data Models
//!
//! This module contains all the SeaORM entity models used throughout the
//! concierge intake service.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod catalog_item;
pub mod category;
pub mod city;
pub mod conversation;
pub mod lead;
pub mod message;
pub mod provider_context;
pub mod provider_dispatch;
pub mod provider_profile;
pub mod provider_user;
pub mod search_cache;
pub mod service_request;
pub mod webhook_event;

pub use catalog_item::Entity as CatalogItem;
pub use category::Entity as Category;
pub use city::Entity as City;
pub use conversation::Entity as Conversation;
pub use lead::Entity as Lead;
pub use message::Entity as Message;
pub use provider_context::Entity as ProviderContext;
pub use provider_dispatch::Entity as ProviderDispatch;
pub use provider_profile::Entity as ProviderProfile;
pub use provider_user::Entity as ProviderUser;
pub use search_cache::Entity as SearchCache;
pub use service_request::Entity as ServiceRequest;
pub use webhook_event::Entity as WebhookEvent;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "concierge-intake".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
