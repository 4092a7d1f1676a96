//! Tenant domain model.
//!
//! A tenant is one billing business. Every customer, charge, message
//! and (non super-admin) user is scoped to exactly one tenant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The stored half of a tenant's integration token: its public id and
/// the bcrypt hash of the full token string. Both are present or the
/// tenant has no token at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationCredential {
    pub token_id: String,
    pub token_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    /// Lowercase, globally unique.
    pub slug: String,
    pub active: bool,
    /// Opaque per-tenant settings.
    pub config: serde_json::Value,
    #[serde(skip)]
    pub integration_token: Option<IntegrationCredential>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn has_integration_token(&self) -> bool {
        self.integration_token.is_some()
    }

    pub fn summary(&self) -> TenantSummary {
        TenantSummary {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
            active: self.active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TenantSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct CreateTenant {
    pub name: String,
    pub slug: String,
    pub config: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTenant {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub active: Option<bool>,
    pub config: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct TenantFilter {
    pub active: Option<bool>,
    /// Substring match on name or slug.
    pub search: Option<String>,
}

/// Record counts shown on the tenant detail view.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TenantCounts {
    pub users: u64,
    pub customers: u64,
    pub charges: u64,
    pub messages: u64,
}
