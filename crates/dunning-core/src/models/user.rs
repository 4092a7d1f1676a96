//! User domain model.
//!
//! A user either belongs to one tenant or is a super-administrator
//! (`is_admin = true`, no tenant). Users are never hard-deleted; only
//! the `active` flag is toggled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ADMIN" => Some(Role::Admin),
            "USER" => Some(Role::User),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    /// `None` only for a super-administrator.
    pub tenant_id: Option<Uuid>,
    pub email: String,
    /// bcrypt hash. Never sent to clients.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    /// Platform-level administrator flag.
    pub is_admin: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A platform administrator that is not bound to any tenant.
    pub fn is_super_admin(&self) -> bool {
        self.is_admin && self.tenant_id.is_none()
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            is_admin: self.is_admin,
            tenant_id: self.tenant_id,
        }
    }
}

/// The subset of a user that is safe to hand to clients and to attach
/// to an authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_admin: bool,
    pub tenant_id: Option<Uuid>,
}

/// Fields required to create a user. The password arrives already
/// hashed; hashing is the auth layer's concern.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub tenant_id: Option<Uuid>,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}
