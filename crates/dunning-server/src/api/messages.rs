//! Message endpoints. Creation and updates are also open to the
//! integration token of the tenant.

use axum::extract::State;
use axum::response::IntoResponse;
use dunning_billing::calendar;
use dunning_billing::{MessageChanges, MessageQuery, NewMessage};
use dunning_core::models::message::MessageStatus;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::extract::{PathId, TenantScope, ValidJson, ValidQuery};
use crate::api::types::{created, non_empty, ok, page_of, paged};
use crate::app::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub customer_id: Uuid,
    pub charge_id: Option<Uuid>,
    #[validate(length(min = 1, max = 20, message = "phone must be 1 to 20 characters"))]
    pub phone: String,
    #[validate(length(min = 1, message = "body is required"))]
    pub body: String,
    pub status: Option<String>,
    pub scheduled_at: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMessageRequest {
    pub status: Option<MessageStatus>,
    #[serde(default, deserialize_with = "present")]
    pub sent_at: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub error: Option<Option<String>>,
    pub attempts: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageListQuery {
    pub status: Option<MessageStatus>,
    pub customer_id: Option<Uuid>,
    pub charge_id: Option<Uuid>,
    pub search: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent
/// field (`None`, via `#[serde(default)]`).
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub(crate) async fn create_message(
    State(state): State<AppState>,
    TenantScope(tenant_id): TenantScope,
    ValidJson(body): ValidJson<CreateMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .messages
        .create(
            tenant_id,
            NewMessage {
                customer_id: body.customer_id,
                charge_id: body.charge_id,
                phone: body.phone,
                body: body.body,
                status: body.status,
                scheduled_at: body.scheduled_at,
            },
        )
        .await?;
    Ok(created(message))
}

pub(crate) async fn list_messages(
    State(state): State<AppState>,
    TenantScope(tenant_id): TenantScope,
    ValidQuery(query): ValidQuery<MessageListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let from = match non_empty(query.from) {
        Some(raw) => calendar::parse_flexible_datetime(&raw)?,
        None => None,
    };
    let to = match non_empty(query.to) {
        Some(raw) => calendar::parse_flexible_datetime(&raw)?,
        None => None,
    };
    let filter = MessageQuery {
        status: query.status,
        customer_id: query.customer_id,
        charge_id: query.charge_id,
        search: non_empty(query.search),
        from,
        to,
    };
    let pagination = page_of(query.page.as_deref(), query.limit.as_deref(), 20);
    Ok(paged(state.messages.list(tenant_id, filter, pagination).await?))
}

pub(crate) async fn get_message(
    State(state): State<AppState>,
    TenantScope(tenant_id): TenantScope,
    PathId(id): PathId,
) -> Result<impl IntoResponse, ApiError> {
    Ok(ok(state.messages.get(tenant_id, id).await?))
}

/// Serves both `PUT` and `PATCH`; only the fields present change.
pub(crate) async fn update_message(
    State(state): State<AppState>,
    TenantScope(tenant_id): TenantScope,
    PathId(id): PathId,
    ValidJson(body): ValidJson<UpdateMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let changes = MessageChanges {
        status: body.status,
        sent_at: body.sent_at,
        error: body.error,
        attempts: body.attempts,
    };
    Ok(ok(state.messages.update(tenant_id, id, changes).await?))
}
