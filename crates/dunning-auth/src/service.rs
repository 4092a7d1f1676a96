//! Authentication service: login, registration and refresh token
//! lifecycle.

use chrono::{Duration, Utc};
use dunning_core::error::{DunningError, DunningResult};
use dunning_core::models::refresh_token::CreateRefreshToken;
use dunning_core::models::tenant::{Tenant, TenantSummary};
use dunning_core::models::user::{CreateUser, Role, User, UserSummary};
use dunning_core::repository::{RefreshTokenRepository, TenantRepository, UserRepository};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::token;

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Input for self-service registration into an existing tenant.
#[derive(Debug)]
pub struct RegisterInput {
    pub tenant_id: Uuid,
    pub email: String,
    pub password: String,
    pub name: String,
    /// Defaults to [`Role::User`].
    pub role: Option<Role>,
}

/// Access + refresh token pair handed to the client.
#[derive(Debug, Clone)]
pub struct TokenPair {
    /// Signed JWT access token.
    pub access_token: String,
    /// Raw opaque refresh token. Only its digest is stored.
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Successful login or refresh result.
#[derive(Debug, Clone)]
pub struct LoginOutput {
    pub user: UserSummary,
    pub tenant: Option<TenantSummary>,
    pub tokens: TokenPair,
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the database crate.
pub struct AuthService<U: UserRepository, T: TenantRepository, R: RefreshTokenRepository> {
    user_repo: U,
    tenant_repo: T,
    refresh_repo: R,
    config: AuthConfig,
}

impl<U, T, R> AuthService<U, T, R>
where
    U: UserRepository,
    T: TenantRepository,
    R: RefreshTokenRepository,
{
    pub fn new(user_repo: U, tenant_repo: T, refresh_repo: R, config: AuthConfig) -> Self {
        Self {
            user_repo,
            tenant_repo,
            refresh_repo,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Check an email/password pair and return the user with its
    /// tenant.
    ///
    /// An unknown email and a wrong password fail with the same error.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> DunningResult<(User, Option<Tenant>)> {
        let user = match self.user_repo.get_active_by_email(email).await {
            Ok(user) => user,
            Err(DunningError::NotFound { .. }) => {
                debug!("Login rejected: no active user for email");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        if !password::verify_password(password, &user.password_hash)? {
            debug!(user_id = %user.id, "Login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials.into());
        }

        let tenant = self.active_tenant_of(&user).await?;
        Ok((user, tenant))
    }

    /// Authenticate and issue a fresh token pair.
    pub async fn login(&self, input: LoginInput) -> DunningResult<LoginOutput> {
        let (user, tenant) = self.authenticate(&input.email, &input.password).await?;
        let output = self.open_session(&user, tenant.as_ref()).await?;
        info!(user_id = %user.id, tenant_id = ?user.tenant_id, "User logged in");
        Ok(output)
    }

    /// Create a USER (or requested role) inside an active tenant and
    /// open a session for it.
    pub async fn register(&self, input: RegisterInput) -> DunningResult<LoginOutput> {
        if input.password.len() < self.config.min_password_length {
            return Err(DunningError::validation(format!(
                "password must be at least {} characters",
                self.config.min_password_length
            )));
        }

        let tenant = match self.tenant_repo.get_by_id(input.tenant_id).await {
            Ok(t) if t.active => t,
            Ok(_) | Err(DunningError::NotFound { .. }) => {
                return Err(DunningError::not_found("tenant", input.tenant_id));
            }
            Err(e) => return Err(e),
        };

        if self
            .user_repo
            .find_by_email_in_tenant(tenant.id, &input.email)
            .await?
            .is_some()
        {
            return Err(DunningError::already_exists("user", "email"));
        }

        let password_hash = password::hash_password(&input.password, self.config.bcrypt_cost)?;
        let user = self
            .user_repo
            .create(CreateUser {
                tenant_id: Some(tenant.id),
                email: input.email,
                password_hash,
                name: input.name,
                role: input.role.unwrap_or_default(),
                is_admin: false,
            })
            .await?;

        let output = self.open_session(&user, Some(&tenant)).await?;
        info!(user_id = %user.id, tenant_id = %tenant.id, "User registered");
        Ok(output)
    }

    pub fn issue_access_token(&self, user: &User) -> DunningResult<String> {
        Ok(token::issue_access_token(user, &self.config)?)
    }

    /// Store a new refresh token for `user_id` and return its raw
    /// value. The user's expired tokens are swept first.
    pub async fn issue_refresh_token(&self, user_id: Uuid) -> DunningResult<String> {
        let now = Utc::now();
        let swept = self
            .refresh_repo
            .delete_expired_for_user(user_id, now)
            .await?;
        if swept > 0 {
            debug!(%user_id, swept, "Swept expired refresh tokens");
        }

        let raw = token::generate_refresh_token();
        self.refresh_repo
            .create(CreateRefreshToken {
                user_id,
                token_hash: token::hash_refresh_token(&raw),
                expires_at: now + Duration::seconds(self.config.refresh_token_lifetime_secs as i64),
            })
            .await?;

        Ok(raw)
    }

    /// Resolve the owner of a refresh token, enforcing expiry and the
    /// owner's and tenant's active flags. The token is not consumed.
    pub async fn refresh(&self, raw_refresh_token: &str) -> DunningResult<(User, Option<Tenant>)> {
        let token_hash = token::hash_refresh_token(raw_refresh_token);
        let stored = match self.refresh_repo.get_by_token_hash(&token_hash).await {
            Ok(t) => t,
            Err(DunningError::NotFound { .. }) => {
                return Err(AuthError::RefreshTokenInvalid.into());
            }
            Err(e) => return Err(e),
        };

        if stored.is_expired_at(Utc::now()) {
            self.refresh_repo.delete(stored.id).await?;
            return Err(AuthError::RefreshTokenExpired.into());
        }

        let user = match self.user_repo.get_by_id(stored.user_id).await {
            Ok(u) => u,
            Err(DunningError::NotFound { .. }) => {
                self.refresh_repo.delete(stored.id).await?;
                return Err(AuthError::RefreshTokenInvalid.into());
            }
            Err(e) => return Err(e),
        };

        if !user.active {
            warn!(user_id = %user.id, "Refresh by inactive user; revoking all tokens");
            self.refresh_repo.delete_for_user(user.id).await?;
            return Err(AuthError::AccountInactive.into());
        }

        let tenant = self.active_tenant_of(&user).await?;
        Ok((user, tenant))
    }

    /// Exchange a refresh token for a new token pair.
    ///
    /// The consumed token is revoked before the replacement is issued.
    /// These are two separate writes: a concurrent rotation of the same
    /// token can succeed twice.
    pub async fn rotate(&self, raw_refresh_token: &str) -> DunningResult<LoginOutput> {
        let (user, tenant) = self.refresh(raw_refresh_token).await?;
        self.revoke(raw_refresh_token).await?;
        self.open_session(&user, tenant.as_ref()).await
    }

    /// Revoke one refresh token. Unknown tokens are ignored.
    pub async fn revoke(&self, raw_refresh_token: &str) -> DunningResult<()> {
        self.refresh_repo
            .delete_by_token_hash(&token::hash_refresh_token(raw_refresh_token))
            .await
    }

    /// Revoke every refresh token of a user.
    pub async fn revoke_all(&self, user_id: Uuid) -> DunningResult<()> {
        self.refresh_repo.delete_for_user(user_id).await
    }

    /// Delete every expired refresh token.
    pub async fn purge_expired(&self) -> DunningResult<u64> {
        let purged = self.refresh_repo.delete_all_expired(Utc::now()).await?;
        info!(purged, "Purged expired refresh tokens");
        Ok(purged)
    }

    /// The user behind an authenticated request, with its tenant.
    pub async fn profile(&self, user_id: Uuid) -> DunningResult<(User, Option<Tenant>)> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let tenant = match user.tenant_id {
            Some(tenant_id) => Some(self.tenant_repo.get_by_id(tenant_id).await?),
            None => None,
        };
        Ok((user, tenant))
    }

    async fn open_session(
        &self,
        user: &User,
        tenant: Option<&Tenant>,
    ) -> DunningResult<LoginOutput> {
        let access_token = self.issue_access_token(user)?;
        let refresh_token = self.issue_refresh_token(user.id).await?;

        Ok(LoginOutput {
            user: user.summary(),
            tenant: tenant.map(Tenant::summary),
            tokens: TokenPair {
                access_token,
                refresh_token,
                expires_in: self.config.access_token_lifetime_secs,
            },
        })
    }

    /// The user's tenant, which must exist and be active.
    async fn active_tenant_of(&self, user: &User) -> DunningResult<Option<Tenant>> {
        let Some(tenant_id) = user.tenant_id else {
            return Ok(None);
        };
        match self.tenant_repo.get_by_id(tenant_id).await {
            Ok(tenant) if tenant.active => Ok(Some(tenant)),
            Ok(_) | Err(DunningError::NotFound { .. }) => {
                debug!(user_id = %user.id, %tenant_id, "Rejected: tenant inactive");
                Err(AuthError::TenantInactive.into())
            }
            Err(e) => Err(e),
        }
    }
}
