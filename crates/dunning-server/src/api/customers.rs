//! Customer endpoints. Tenant scoped.

use axum::extract::State;
use axum::response::IntoResponse;
use dunning_core::models::customer::{
    CreateCustomer, CustomerFilter, CustomerSortField, SortOrder, UpdateCustomer,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::extract::{PathId, TenantScope, ValidJson, ValidQuery};
use crate::api::types::{created, flag_of, non_empty, ok, page_of, paged};
use crate::app::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, max = 255, message = "name must be 1 to 255 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 20, message = "phone must be 1 to 20 characters"))]
    pub phone: String,
    pub amount: f64,
    #[validate(range(min = 1, max = 31, message = "dueDay must be between 1 and 31"))]
    pub due_day: u8,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, max = 255, message = "name must be 1 to 255 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 20, message = "phone must be 1 to 20 characters"))]
    pub phone: Option<String>,
    pub amount: Option<f64>,
    #[validate(range(min = 1, max = 31, message = "dueDay must be between 1 and 31"))]
    pub due_day: Option<u8>,
    pub notes: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerListQuery {
    pub active: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<CustomerSortField>,
    pub sort_order: Option<SortOrder>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

pub(crate) async fn create_customer(
    State(state): State<AppState>,
    TenantScope(tenant_id): TenantScope,
    ValidJson(body): ValidJson<CreateCustomerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = state
        .customers
        .create(
            tenant_id,
            CreateCustomer {
                name: body.name,
                phone: body.phone,
                amount: body.amount,
                due_day: body.due_day,
                notes: body.notes,
            },
        )
        .await?;
    Ok(created(customer))
}

pub(crate) async fn list_customers(
    State(state): State<AppState>,
    TenantScope(tenant_id): TenantScope,
    ValidQuery(query): ValidQuery<CustomerListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = CustomerFilter {
        active: flag_of(query.active.as_deref()),
        search: non_empty(query.search),
        sort_by: query.sort_by.unwrap_or_default(),
        sort_order: query.sort_order.unwrap_or_default(),
    };
    let pagination = page_of(query.page.as_deref(), query.limit.as_deref(), 10);
    Ok(paged(state.customers.list(tenant_id, filter, pagination).await?))
}

pub(crate) async fn get_customer(
    State(state): State<AppState>,
    TenantScope(tenant_id): TenantScope,
    PathId(id): PathId,
) -> Result<impl IntoResponse, ApiError> {
    Ok(ok(state.customers.get(tenant_id, id).await?))
}

pub(crate) async fn update_customer(
    State(state): State<AppState>,
    TenantScope(tenant_id): TenantScope,
    PathId(id): PathId,
    ValidJson(body): ValidJson<UpdateCustomerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let changes = UpdateCustomer {
        name: body.name,
        phone: body.phone,
        amount: body.amount,
        due_day: body.due_day,
        notes: body.notes,
        active: body.active,
    };
    Ok(ok(state.customers.update(tenant_id, id, changes).await?))
}

/// `DELETE` deactivates; charges and messages keep their customer.
pub(crate) async fn deactivate_customer(
    State(state): State<AppState>,
    TenantScope(tenant_id): TenantScope,
    PathId(id): PathId,
) -> Result<impl IntoResponse, ApiError> {
    Ok(ok(state.customers.deactivate(tenant_id, id).await?))
}

pub(crate) async fn activate_customer(
    State(state): State<AppState>,
    TenantScope(tenant_id): TenantScope,
    PathId(id): PathId,
) -> Result<impl IntoResponse, ApiError> {
    Ok(ok(state.customers.activate(tenant_id, id).await?))
}
