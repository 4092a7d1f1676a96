//! Dunning HTTP server: configuration, router and handlers.

pub mod api;
pub mod app;
pub mod config;
