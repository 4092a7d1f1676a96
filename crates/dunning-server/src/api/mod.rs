//! HTTP handlers, extractors and the error/response envelopes.

pub mod auth;
pub mod charges;
pub mod customers;
pub mod dashboard;
pub mod error;
pub mod extract;
pub mod integrations;
pub mod messages;
pub mod middleware;
pub mod system;
pub mod tenants;
pub mod types;
