//! Session endpoints: login, registration, refresh, logout and profile.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use dunning_auth::{LoginInput, LoginOutput, RegisterInput};
use dunning_core::models::tenant::TenantSummary;
use dunning_core::models::user::{Role, UserSummary};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::error::{ApiError, api_unauthorized};
use crate::api::extract::{Auth, ValidJson};
use crate::api::types::{ApiResponse, created, ok};
use crate::app::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "invalid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub tenant_id: Uuid,
    #[validate(email(message = "invalid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    #[validate(length(min = 1, max = 255, message = "name must be 1 to 255 characters"))]
    pub name: String,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "refreshToken is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogoutRequest {
    refresh_token: Option<String>,
}

/// Token pair plus the caller's identity.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub user: UserSummary,
    pub tenant: Option<TenantSummary>,
}

impl From<LoginOutput> for SessionResponse {
    fn from(output: LoginOutput) -> Self {
        Self {
            access_token: output.tokens.access_token,
            refresh_token: output.tokens.refresh_token,
            expires_in: output.tokens.expires_in,
            user: output.user,
            tenant: output.tenant,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: UserSummary,
    pub created_at: DateTime<Utc>,
    pub tenant: Option<TenantSummary>,
}

pub(crate) async fn login(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let output = state
        .auth
        .login(LoginInput {
            email: body.email,
            password: body.password,
        })
        .await?;
    Ok(ok(SessionResponse::from(output)))
}

pub(crate) async fn register(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let output = state
        .auth
        .register(RegisterInput {
            tenant_id: body.tenant_id,
            email: body.email,
            password: body.password,
            name: body.name,
            role: body.role,
        })
        .await?;
    Ok(created(SessionResponse::from(output)))
}

pub(crate) async fn refresh(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let output = state.auth.rotate(&body.refresh_token).await?;
    Ok(ok(SessionResponse::from(output)))
}

/// Always succeeds. A presented refresh token is revoked on a best
/// effort basis.
pub(crate) async fn logout(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let request: LogoutRequest = serde_json::from_slice(&body).unwrap_or_default();
    if let Some(token) = request.refresh_token.filter(|t| !t.is_empty()) {
        if let Err(e) = state.auth.revoke(&token).await {
            tracing::warn!(error = %e, "Failed to revoke refresh token on logout");
        }
    }
    axum::Json(ApiResponse::new(serde_json::Value::Null).with_message("logged out"))
}

pub(crate) async fn me(
    State(state): State<AppState>,
    Auth(ctx): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = ctx
        .user()
        .map(|u| u.id)
        .ok_or_else(|| api_unauthorized("user session required"))?;
    let (user, tenant) = state.auth.profile(user_id).await?;
    Ok(ok(ProfileResponse {
        created_at: user.created_at,
        user: user.summary(),
        tenant: tenant.map(|t| t.summary()),
    }))
}
