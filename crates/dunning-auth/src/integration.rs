//! Per-tenant integration tokens.
//!
//! A tenant holds at most one integration token. Only its public id
//! and a bcrypt hash over the SHA-256 digest of the whole token string
//! are stored; the plaintext is returned once, at generation.

use dunning_core::error::{DunningError, DunningResult};
use dunning_core::models::tenant::{IntegrationCredential, TenantSummary};
use dunning_core::repository::TenantRepository;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AuthError;
use crate::password;
use crate::token;

pub struct IntegrationTokenService<T: TenantRepository> {
    tenant_repo: T,
    bcrypt_cost: u32,
}

impl<T: TenantRepository> IntegrationTokenService<T> {
    pub fn new(tenant_repo: T, bcrypt_cost: u32) -> Self {
        Self {
            tenant_repo,
            bcrypt_cost,
        }
    }

    /// Issue a new token for an active tenant, replacing any existing
    /// one. Returns the plaintext token.
    pub async fn generate(&self, tenant_id: Uuid) -> DunningResult<String> {
        let tenant = match self.tenant_repo.get_by_id(tenant_id).await {
            Ok(t) if t.active => t,
            Ok(_) | Err(DunningError::NotFound { .. }) => {
                return Err(DunningError::not_found("tenant", tenant_id));
            }
            Err(e) => return Err(e),
        };

        let (token_id, token) = token::generate_integration_token();
        let token_hash = password::hash_password(
            &token::integration_token_digest(&token),
            self.bcrypt_cost,
        )?;

        self.tenant_repo
            .set_integration_token(
                tenant.id,
                Some(IntegrationCredential {
                    token_id: token_id.clone(),
                    token_hash,
                }),
            )
            .await?;

        info!(
            %tenant_id,
            %token_id,
            replaced = tenant.has_integration_token(),
            "Integration token generated"
        );
        Ok(token)
    }

    /// Clear the tenant's token.
    pub async fn revoke(&self, tenant_id: Uuid) -> DunningResult<()> {
        let tenant = self.tenant_repo.get_by_id(tenant_id).await?;
        if !tenant.has_integration_token() {
            return Err(DunningError::validation(
                "tenant has no integration token",
            ));
        }

        self.tenant_repo
            .set_integration_token(tenant.id, None)
            .await?;
        info!(%tenant_id, "Integration token revoked");
        Ok(())
    }

    /// Resolve the active tenant a presented token belongs to.
    ///
    /// The bcrypt check runs against the full token string, so a
    /// known id paired with a foreign secret is rejected.
    pub async fn validate(&self, presented: &str) -> DunningResult<TenantSummary> {
        let token_id = token::integration_token_id(presented)?;

        let tenant = match self
            .tenant_repo
            .get_active_by_integration_token_id(token_id)
            .await
        {
            Ok(t) => t,
            Err(DunningError::NotFound { .. }) => {
                debug!(%token_id, "Integration token id unknown");
                return Err(AuthError::IntegrationTokenInvalid("unknown token").into());
            }
            Err(e) => return Err(e),
        };

        let Some(credential) = tenant.integration_token.as_ref() else {
            return Err(AuthError::IntegrationTokenInvalid("token not configured").into());
        };

        let digest = token::integration_token_digest(presented);
        if !password::verify_password(&digest, &credential.token_hash)? {
            debug!(tenant_id = %tenant.id, "Integration token secret mismatch");
            return Err(AuthError::IntegrationTokenInvalid("secret mismatch").into());
        }

        Ok(tenant.summary())
    }
}
