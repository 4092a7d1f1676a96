//! Dunning Core: domain models, error types, and repository traits
//! shared by every crate of the billing backend.

pub mod error;
pub mod models;
pub mod repository;
