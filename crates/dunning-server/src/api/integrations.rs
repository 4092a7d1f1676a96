//! Integration token management. Super-admin only.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::{ApiError, api_validation_error};
use crate::api::extract::{Auth, SuperAdmin, optional_json};
use crate::api::types::{ApiResponse, ok};
use crate::app::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTarget {
    pub tenant_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct IssuedToken {
    pub token: String,
}

/// Body first, then the caller's own tenant.
fn target_tenant(target: TokenTarget, own: Option<Uuid>) -> Result<Uuid, ApiError> {
    target
        .tenant_id
        .or(own)
        .ok_or_else(|| api_validation_error("tenantId is required"))
}

pub(crate) async fn generate_token(
    State(state): State<AppState>,
    SuperAdmin(admin): SuperAdmin,
    Auth(ctx): Auth,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = target_tenant(optional_json(&body)?, ctx.tenant_id())?;
    let token = state.integrations.generate(tenant_id).await?;
    tracing::info!(%tenant_id, admin_id = %admin.id, "Integration token issued");
    Ok(axum::Json(
        ApiResponse::new(IssuedToken { token })
            .with_message("store this token securely; it will not be shown again"),
    ))
}

pub(crate) async fn revoke_token(
    State(state): State<AppState>,
    SuperAdmin(admin): SuperAdmin,
    Auth(ctx): Auth,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = target_tenant(optional_json(&body)?, ctx.tenant_id())?;
    state.integrations.revoke(tenant_id).await?;
    tracing::info!(%tenant_id, admin_id = %admin.id, "Integration token revoked");
    Ok(ok(serde_json::json!({ "tenantId": tenant_id })))
}
