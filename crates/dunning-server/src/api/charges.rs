//! Charge endpoints. Tenant scoped; the summary is also reachable with
//! an integration token.

use axum::extract::State;
use axum::response::IntoResponse;
use chrono::NaiveDate;
use dunning_billing::calendar;
use dunning_billing::{ChargeChanges, ChargeQuery, NewCharge};
use dunning_core::models::charge::ChargeStatus;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::error::{ApiError, api_validation_error};
use crate::api::extract::{PathId, TenantScope, ValidJson, ValidQuery};
use crate::api::types::{created, number_of, ok, page_of, paged};
use crate::app::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateChargeRequest {
    pub customer_id: Uuid,
    pub amount: f64,
    /// `YYYY-MM-DD`, an ISO 8601 timestamp or `dd/MM/yyyy`.
    pub due_date: String,
    pub pix_qr_code: Option<String>,
    pub pix_copy_paste: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChargeRequest {
    pub amount: Option<f64>,
    pub due_date: Option<String>,
    pub status: Option<ChargeStatus>,
    pub pix_qr_code: Option<String>,
    pub pix_copy_paste: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeListQuery {
    pub status: Option<ChargeStatus>,
    pub customer_id: Option<Uuid>,
    pub month: Option<String>,
    pub year: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Calendar day of a due date given in any accepted format.
fn parse_due_date(raw: &str) -> Result<NaiveDate, ApiError> {
    if let Ok(date) = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        return Ok(date);
    }
    calendar::parse_flexible_datetime(raw)?
        .map(|at| at.date_naive())
        .ok_or_else(|| api_validation_error("dueDate is required"))
}

pub(crate) async fn create_charge(
    State(state): State<AppState>,
    TenantScope(tenant_id): TenantScope,
    ValidJson(body): ValidJson<CreateChargeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let charge = state
        .charges
        .create(
            tenant_id,
            NewCharge {
                customer_id: body.customer_id,
                amount: body.amount,
                due_date: parse_due_date(&body.due_date)?,
                pix_qr_code: body.pix_qr_code,
                pix_copy_paste: body.pix_copy_paste,
                notes: body.notes,
            },
        )
        .await?;
    Ok(created(charge))
}

pub(crate) async fn list_charges(
    State(state): State<AppState>,
    TenantScope(tenant_id): TenantScope,
    ValidQuery(query): ValidQuery<ChargeListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = ChargeQuery {
        status: query.status,
        customer_id: query.customer_id,
        month: number_of(query.month.as_deref()),
        year: number_of(query.year.as_deref()),
    };
    let pagination = page_of(query.page.as_deref(), query.limit.as_deref(), 10);
    Ok(paged(state.charges.list(tenant_id, filter, pagination).await?))
}

pub(crate) async fn get_charge(
    State(state): State<AppState>,
    TenantScope(tenant_id): TenantScope,
    PathId(id): PathId,
) -> Result<impl IntoResponse, ApiError> {
    Ok(ok(state.charges.get(tenant_id, id).await?))
}

pub(crate) async fn update_charge(
    State(state): State<AppState>,
    TenantScope(tenant_id): TenantScope,
    PathId(id): PathId,
    ValidJson(body): ValidJson<UpdateChargeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let changes = ChargeChanges {
        amount: body.amount,
        due_date: body.due_date.as_deref().map(parse_due_date).transpose()?,
        status: body.status,
        pix_qr_code: body.pix_qr_code,
        pix_copy_paste: body.pix_copy_paste,
        notes: body.notes,
    };
    Ok(ok(state.charges.update(tenant_id, id, changes).await?))
}

pub(crate) async fn mark_paid(
    State(state): State<AppState>,
    TenantScope(tenant_id): TenantScope,
    PathId(id): PathId,
) -> Result<impl IntoResponse, ApiError> {
    Ok(ok(state.charges.mark_paid(tenant_id, id).await?))
}

pub(crate) async fn due_today(
    State(state): State<AppState>,
    TenantScope(tenant_id): TenantScope,
) -> Result<impl IntoResponse, ApiError> {
    Ok(ok(state.charges.due_today(tenant_id).await?))
}

pub(crate) async fn overdue(
    State(state): State<AppState>,
    TenantScope(tenant_id): TenantScope,
) -> Result<impl IntoResponse, ApiError> {
    Ok(ok(state.charges.overdue(tenant_id).await?))
}

pub(crate) async fn summary(
    State(state): State<AppState>,
    TenantScope(tenant_id): TenantScope,
) -> Result<impl IntoResponse, ApiError> {
    Ok(ok(state.charges.summary(tenant_id).await?))
}
