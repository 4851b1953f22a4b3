//! # Concierge Intake Library
//!
//! This library provides the core functionality for the concierge intake
//! service: webhook ingestion, intent-driven service-request creation, and
//! provider dispatch, plus handlers, models, and server configuration.

pub mod cache;
pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod repositories;
pub mod seeds;
pub mod server;
pub mod telemetry;
pub use migration;
