//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM
//! operations for database entities. The idempotency-bearing operations
//! (event admission, thread resolution, dispatch upsert) all live here and
//! share one discipline: insert first, treat a unique violation as "the row
//! already exists", and never hold locks across entities.

pub mod context;
pub mod conversation;
pub mod dispatch;
pub mod event_gate;
pub mod lead;
pub mod message;
pub mod provider;
pub mod service_request;
pub mod taxonomy;

pub use context::ContextRepository;
pub use conversation::ConversationRepository;
pub use dispatch::DispatchRepository;
pub use event_gate::EventGateRepository;
pub use lead::LeadRepository;
pub use message::MessageRepository;
pub use provider::ProviderRepository;
pub use service_request::ServiceRequestRepository;
pub use taxonomy::TaxonomyRepository;
