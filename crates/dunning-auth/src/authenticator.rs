//! Per-request authentication.
//!
//! Every request is classified by method and path, then resolved into
//! an immutable [`AuthContext`] (or rejected) before any handler runs.

use dunning_core::error::{DunningError, DunningResult};
use dunning_core::models::tenant::TenantSummary;
use dunning_core::models::user::UserSummary;
use dunning_core::repository::{TenantRepository, UserRepository};
use tracing::debug;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::integration::IntegrationTokenService;
use crate::token;

/// How a route may be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// No credentials needed.
    Public,
    /// An `X-API-Token` header is accepted in place of a session.
    IntegrationOrSession,
    /// Bearer access token required.
    Session,
}

impl RouteAccess {
    pub fn classify(method: &str, path: &str) -> Self {
        let path = match path.trim_end_matches('/') {
            "" => "/",
            p => p,
        };
        let segments: Vec<&str> = path.split('/').skip(1).collect();

        match (method, segments.as_slice()) {
            ("GET", ["health"])
            | ("POST", ["api", "auth", "login" | "register" | "refresh" | "logout"])
            | ("POST", ["api", "tenants"])
            | ("GET", ["api", "tenants", "slug", _]) => RouteAccess::Public,

            ("GET", ["api", "charges", "summary"])
            | ("POST", ["api", "messages"])
            | ("PUT" | "PATCH", ["api", "messages", _]) => RouteAccess::IntegrationOrSession,

            _ => RouteAccess::Session,
        }
    }
}

/// Raw credentials pulled off a request.
#[derive(Debug, Clone, Default)]
pub struct RequestCredentials {
    /// Value of the `Authorization` header.
    pub authorization: Option<String>,
    /// Value of the `X-API-Token` header.
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    User(UserSummary),
    Integration,
}

/// Who is calling and in which tenant. Built once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub principal: Principal,
    /// `None` only for a super-admin session.
    pub tenant: Option<TenantSummary>,
}

impl AuthContext {
    pub fn tenant_id(&self) -> Option<Uuid> {
        self.tenant.as_ref().map(|t| t.id)
    }

    pub fn user(&self) -> Option<&UserSummary> {
        match &self.principal {
            Principal::User(user) => Some(user),
            Principal::Integration => None,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.user()
            .is_some_and(|u| u.is_admin && u.tenant_id.is_none())
    }

    /// The tenant every scoped operation must run in.
    pub fn require_tenant(&self) -> DunningResult<Uuid> {
        self.tenant_id()
            .ok_or_else(|| DunningError::forbidden("tenant scope required"))
    }

    pub fn require_super_admin(&self) -> DunningResult<&UserSummary> {
        match self.user() {
            Some(user) if self.is_super_admin() => Ok(user),
            _ => Err(DunningError::forbidden("super-admin access required")),
        }
    }
}

pub struct Authenticator<U: UserRepository, T: TenantRepository> {
    user_repo: U,
    tenant_repo: T,
    integrations: IntegrationTokenService<T>,
    config: AuthConfig,
}

impl<U, T> Authenticator<U, T>
where
    U: UserRepository,
    T: TenantRepository + Clone,
{
    pub fn new(user_repo: U, tenant_repo: T, config: AuthConfig) -> Self {
        let integrations = IntegrationTokenService::new(tenant_repo.clone(), config.bcrypt_cost);
        Self {
            user_repo,
            tenant_repo,
            integrations,
            config,
        }
    }

    /// Resolve the request's caller. Public routes yield `Ok(None)`.
    pub async fn authenticate(
        &self,
        method: &str,
        path: &str,
        credentials: &RequestCredentials,
    ) -> DunningResult<Option<AuthContext>> {
        match (
            RouteAccess::classify(method, path),
            credentials.api_token.as_deref(),
        ) {
            (RouteAccess::Public, _) => Ok(None),
            (RouteAccess::IntegrationOrSession, Some(presented)) => {
                self.integration_context(presented).await.map(Some)
            }
            _ => self
                .session_context(credentials.authorization.as_deref())
                .await
                .map(Some),
        }
    }

    async fn integration_context(&self, presented: &str) -> DunningResult<AuthContext> {
        match self.integrations.validate(presented).await {
            Ok(tenant) => Ok(AuthContext {
                principal: Principal::Integration,
                tenant: Some(tenant),
            }),
            Err(DunningError::Validation { message }) => {
                Err(DunningError::unauthenticated(message))
            }
            Err(e) => Err(e),
        }
    }

    async fn session_context(&self, authorization: Option<&str>) -> DunningResult<AuthContext> {
        let Some(bearer) = authorization.and_then(|h| h.strip_prefix("Bearer ")) else {
            debug!("Rejected: bearer token missing");
            return Err(AuthError::TokenMissing.into());
        };

        let claims = match token::decode_access_token(bearer.trim(), &self.config) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(reason = %e, "Rejected: access token not accepted");
                return Err(e.into());
            }
        };

        let user = match self
            .user_repo
            .get_active_in_scope(claims.user_id, claims.tenant_id)
            .await
        {
            Ok(user) => user,
            Err(DunningError::NotFound { .. }) => {
                debug!(user_id = %claims.user_id, "Rejected: user not active in token scope");
                return Err(DunningError::unauthenticated("user not found or inactive"));
            }
            Err(e) => return Err(e),
        };

        let tenant = match user.tenant_id {
            Some(tenant_id) => match self.tenant_repo.get_by_id(tenant_id).await {
                Ok(t) if t.active => Some(t.summary()),
                Ok(_) | Err(DunningError::NotFound { .. }) => {
                    return Err(AuthError::TenantInactive.into());
                }
                Err(e) => return Err(e),
            },
            None => None,
        };

        Ok(AuthContext {
            principal: Principal::User(user.summary()),
            tenant,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_routes() {
        assert_eq!(RouteAccess::classify("GET", "/health"), RouteAccess::Public);
        assert_eq!(
            RouteAccess::classify("POST", "/api/auth/login"),
            RouteAccess::Public
        );
        assert_eq!(
            RouteAccess::classify("POST", "/api/tenants/"),
            RouteAccess::Public
        );
        assert_eq!(
            RouteAccess::classify("GET", "/api/tenants/slug/acme"),
            RouteAccess::Public
        );
    }

    #[test]
    fn method_matters() {
        assert_eq!(
            RouteAccess::classify("GET", "/api/auth/login"),
            RouteAccess::Session
        );
        assert_eq!(
            RouteAccess::classify("GET", "/api/auth/me"),
            RouteAccess::Session
        );
        assert_eq!(
            RouteAccess::classify("GET", "/api/messages"),
            RouteAccess::Session
        );
        assert_eq!(
            RouteAccess::classify("DELETE", "/api/messages/abc"),
            RouteAccess::Session
        );
    }

    #[test]
    fn integration_allow_list() {
        for (method, path) in [
            ("GET", "/api/charges/summary"),
            ("POST", "/api/messages"),
            ("PUT", "/api/messages/123"),
            ("PATCH", "/api/messages/123"),
        ] {
            assert_eq!(
                RouteAccess::classify(method, path),
                RouteAccess::IntegrationOrSession,
                "{method} {path}"
            );
        }
        assert_eq!(
            RouteAccess::classify("GET", "/api/charges/overdue"),
            RouteAccess::Session
        );
    }

    #[test]
    fn context_scope_helpers() {
        let admin = UserSummary {
            id: Uuid::new_v4(),
            email: "root@example.com".into(),
            name: "Root".into(),
            role: dunning_core::models::user::Role::Admin,
            is_admin: true,
            tenant_id: None,
        };
        let ctx = AuthContext {
            principal: Principal::User(admin),
            tenant: None,
        };
        assert!(ctx.is_super_admin());
        assert!(ctx.require_super_admin().is_ok());
        assert!(matches!(
            ctx.require_tenant(),
            Err(DunningError::AuthorizationDenied { .. })
        ));

        let integration = AuthContext {
            principal: Principal::Integration,
            tenant: Some(TenantSummary {
                id: Uuid::new_v4(),
                name: "Acme".into(),
                slug: "acme".into(),
                active: true,
            }),
        };
        assert!(!integration.is_super_admin());
        assert!(integration.require_tenant().is_ok());
        assert!(integration.require_super_admin().is_err());
    }
}
