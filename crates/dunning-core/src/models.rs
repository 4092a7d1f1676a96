//! Domain models for the dunning backend.
//!
//! Every record except the super-administrator and the tenant itself
//! belongs to exactly one tenant.

pub mod charge;
pub mod customer;
pub mod message;
pub mod refresh_token;
pub mod tenant;
pub mod user;
