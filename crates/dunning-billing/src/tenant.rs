//! Tenant administration and public onboarding.

use dunning_auth::config::AuthConfig;
use dunning_auth::password;
use dunning_core::error::{DunningError, DunningResult};
use dunning_core::models::tenant::{
    CreateTenant, Tenant, TenantCounts, TenantFilter, TenantSummary, UpdateTenant,
};
use dunning_core::models::user::{CreateUser, Role, UpdateUser, User, UserSummary};
use dunning_core::repository::{PaginatedResult, Pagination, TenantRepository, UserRepository};
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

const SLUG_PATTERN: &str = r"^[a-z0-9-]{1,100}$";

/// Credentials for the tenant's ADMIN user.
#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct NewTenant {
    pub name: String,
    pub slug: String,
    pub config: Option<serde_json::Value>,
    pub admin: Option<AdminAccount>,
}

#[derive(Debug, Clone, Default)]
pub struct TenantChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub active: Option<bool>,
    pub config: Option<serde_json::Value>,
    pub admin: Option<AdminAccount>,
}

/// A tenant with its record counts and ADMIN user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantDetail {
    #[serde(flatten)]
    pub tenant: Tenant,
    pub has_integration_token: bool,
    pub counts: TenantCounts,
    pub admin: Option<UserSummary>,
}

pub struct TenantService<T: TenantRepository, U: UserRepository> {
    tenant_repo: T,
    user_repo: U,
    bcrypt_cost: u32,
    min_password_length: usize,
}

impl<T: TenantRepository, U: UserRepository> TenantService<T, U> {
    pub fn new(tenant_repo: T, user_repo: U, auth: &AuthConfig) -> Self {
        Self {
            tenant_repo,
            user_repo,
            bcrypt_cost: auth.bcrypt_cost,
            min_password_length: auth.min_password_length,
        }
    }

    /// Create a tenant, optionally with its ADMIN user. If the admin
    /// cannot be created the tenant is removed again.
    pub async fn create(&self, input: NewTenant) -> DunningResult<Tenant> {
        let slug = normalize_slug(&input.slug)?;
        if let Some(admin) = &input.admin {
            self.check_password(&admin.password)?;
        }

        let tenant = self
            .tenant_repo
            .create(CreateTenant {
                name: input.name,
                slug,
                config: input.config,
            })
            .await?;

        if let Some(admin) = input.admin {
            if let Err(e) = self.create_admin(tenant.id, admin).await {
                warn!(tenant_id = %tenant.id, error = %e, "Admin provisioning failed; rolling back tenant");
                self.tenant_repo.delete(tenant.id).await?;
                return Err(e);
            }
        }

        info!(tenant_id = %tenant.id, slug = %tenant.slug, "Tenant created");
        Ok(tenant)
    }

    pub async fn list(
        &self,
        filter: TenantFilter,
        pagination: Pagination,
    ) -> DunningResult<PaginatedResult<Tenant>> {
        self.tenant_repo.list(filter, pagination).await
    }

    pub async fn get(&self, id: Uuid) -> DunningResult<TenantDetail> {
        let tenant = self.tenant_repo.get_by_id(id).await?;
        let counts = self.tenant_repo.counts(id).await?;
        let admin = self.user_repo.find_tenant_admin(id).await?;
        Ok(TenantDetail {
            has_integration_token: tenant.has_integration_token(),
            tenant,
            counts,
            admin: admin.as_ref().map(|u| u.summary()),
        })
    }

    /// Public lookup used by clients to bootstrap a login page.
    /// Inactive tenants are reported as missing.
    pub async fn get_by_slug(&self, slug: &str) -> DunningResult<TenantSummary> {
        let slug = slug.trim().to_lowercase();
        match self.tenant_repo.get_by_slug(&slug).await? {
            tenant if tenant.active => Ok(tenant.summary()),
            _ => Err(DunningError::not_found("tenant", slug)),
        }
    }

    /// Apply changes; `admin` creates or replaces the tenant's ADMIN
    /// user credentials.
    pub async fn update(&self, id: Uuid, changes: TenantChanges) -> DunningResult<Tenant> {
        let existing = self.tenant_repo.get_by_id(id).await?;

        let slug = match changes.slug.as_deref() {
            Some(raw) => Some(normalize_slug(raw)?),
            None => None,
        };
        if let Some(slug) = slug.as_deref().filter(|s| *s != existing.slug) {
            match self.tenant_repo.get_by_slug(slug).await {
                Ok(_) => return Err(DunningError::already_exists("tenant", "slug")),
                Err(DunningError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        // Admin conflicts are resolved before anything is written.
        let admin = match changes.admin {
            Some(admin) => {
                self.check_password(&admin.password)?;
                let current = self.admin_slot(id, &admin.email).await?;
                Some((admin, current))
            }
            None => None,
        };

        let tenant = self
            .tenant_repo
            .update(
                id,
                UpdateTenant {
                    name: changes.name,
                    slug,
                    active: changes.active,
                    config: changes.config,
                },
            )
            .await?;

        if let Some((admin, current)) = admin {
            self.write_admin(id, admin, current).await?;
        }

        info!(tenant_id = %id, "Tenant updated");
        Ok(tenant)
    }

    pub async fn activate(&self, id: Uuid) -> DunningResult<Tenant> {
        self.set_active(id, true).await
    }

    pub async fn deactivate(&self, id: Uuid) -> DunningResult<Tenant> {
        self.set_active(id, false).await
    }

    async fn set_active(&self, id: Uuid, active: bool) -> DunningResult<Tenant> {
        let tenant = self.tenant_repo.get_by_id(id).await?;
        if tenant.active == active {
            let state = if active { "active" } else { "inactive" };
            return Err(DunningError::validation(format!("tenant is already {state}")));
        }

        let tenant = self
            .tenant_repo
            .update(
                id,
                UpdateTenant {
                    active: Some(active),
                    ..Default::default()
                },
            )
            .await?;
        info!(tenant_id = %id, active, "Tenant activation changed");
        Ok(tenant)
    }

    async fn create_admin(&self, tenant_id: Uuid, admin: AdminAccount) -> DunningResult<()> {
        if self
            .user_repo
            .find_by_email_in_tenant(tenant_id, &admin.email)
            .await?
            .is_some()
        {
            return Err(DunningError::already_exists("user", "email"));
        }

        self.user_repo
            .create(CreateUser {
                tenant_id: Some(tenant_id),
                email: admin.email,
                password_hash: password::hash_password(&admin.password, self.bcrypt_cost)?,
                name: admin.name,
                role: Role::Admin,
                is_admin: false,
            })
            .await?;
        Ok(())
    }

    /// The tenant's current ADMIN, after checking that `email` is free
    /// or already theirs.
    async fn admin_slot(&self, tenant_id: Uuid, email: &str) -> DunningResult<Option<User>> {
        let current = self.user_repo.find_tenant_admin(tenant_id).await?;

        let clash = self
            .user_repo
            .find_by_email_in_tenant(tenant_id, email)
            .await?;
        if let Some(other) = clash {
            if current.as_ref().is_none_or(|c| c.id != other.id) {
                return Err(DunningError::already_exists("user", "email"));
            }
        }
        Ok(current)
    }

    async fn write_admin(
        &self,
        tenant_id: Uuid,
        admin: AdminAccount,
        current: Option<User>,
    ) -> DunningResult<()> {
        match current {
            Some(current) => {
                self.user_repo
                    .update(
                        current.id,
                        UpdateUser {
                            email: Some(admin.email),
                            password_hash: Some(password::hash_password(
                                &admin.password,
                                self.bcrypt_cost,
                            )?),
                            name: Some(admin.name),
                            ..Default::default()
                        },
                    )
                    .await?;
                Ok(())
            }
            None => self.create_admin(tenant_id, admin).await,
        }
    }

    fn check_password(&self, password: &str) -> DunningResult<()> {
        if password.len() < self.min_password_length {
            return Err(DunningError::validation(format!(
                "password must be at least {} characters",
                self.min_password_length
            )));
        }
        Ok(())
    }
}

/// Lowercase and check a slug.
pub fn normalize_slug(raw: &str) -> DunningResult<String> {
    let slug = raw.trim().to_lowercase();
    let pattern = Regex::new(SLUG_PATTERN)
        .map_err(|e| DunningError::Internal(format!("slug pattern: {e}")))?;
    if !pattern.is_match(&slug) {
        return Err(DunningError::validation(
            "slug may only contain lowercase letters, digits and hyphens (1-100 chars)",
        ));
    }
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_lowercased() {
        assert_eq!(normalize_slug(" Acme-Pay ").unwrap(), "acme-pay");
    }

    #[test]
    fn slug_rejects_other_characters() {
        for bad in ["", "acme pay", "acme_pay", "açaí", &"a".repeat(101)] {
            assert!(normalize_slug(bad).is_err(), "{bad:?}");
        }
    }
}
