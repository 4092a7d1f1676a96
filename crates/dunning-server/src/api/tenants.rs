//! Tenant onboarding, public lookup and super-admin management.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use dunning_billing::{AdminAccount, NewTenant, TenantChanges};
use dunning_core::models::tenant::TenantFilter;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::api::error::{ApiError, api_not_found};
use crate::api::extract::{PathId, SuperAdmin, ValidJson, ValidQuery};
use crate::api::types::{created, flag_of, non_empty, ok, page_of, paged};
use crate::app::AppState;

/// Admin credentials arrive as three flat fields that must be given
/// together.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "admin_fields_together"))]
pub struct CreateTenantRequest {
    #[validate(length(min = 1, max = 255, message = "name must be 1 to 255 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "slug must be 1 to 100 characters"))]
    pub slug: String,
    pub config: Option<serde_json::Value>,
    #[validate(email(message = "invalid email"))]
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    #[validate(length(min = 1, max = 255, message = "adminName must be 1 to 255 characters"))]
    pub admin_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "admin_fields_together_on_update"))]
pub struct UpdateTenantRequest {
    #[validate(length(min = 1, max = 255, message = "name must be 1 to 255 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "slug must be 1 to 100 characters"))]
    pub slug: Option<String>,
    pub active: Option<bool>,
    pub config: Option<serde_json::Value>,
    #[validate(email(message = "invalid email"))]
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    #[validate(length(min = 1, max = 255, message = "adminName must be 1 to 255 characters"))]
    pub admin_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TenantListQuery {
    pub active: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

fn admin_account(
    email: Option<String>,
    password: Option<String>,
    name: Option<String>,
) -> Option<AdminAccount> {
    match (email, password, name) {
        (Some(email), Some(password), Some(name)) => Some(AdminAccount {
            email,
            password,
            name,
        }),
        _ => None,
    }
}

fn check_admin_fields(
    email: &Option<String>,
    password: &Option<String>,
    name: &Option<String>,
) -> Result<(), ValidationError> {
    let given = [email.is_some(), password.is_some(), name.is_some()];
    if given.iter().any(|g| *g) && !given.iter().all(|g| *g) {
        return Err(ValidationError::new("admin_fields")
            .with_message("adminEmail, adminPassword and adminName must be given together".into()));
    }
    Ok(())
}

fn admin_fields_together(req: &CreateTenantRequest) -> Result<(), ValidationError> {
    check_admin_fields(&req.admin_email, &req.admin_password, &req.admin_name)
}

fn admin_fields_together_on_update(req: &UpdateTenantRequest) -> Result<(), ValidationError> {
    check_admin_fields(&req.admin_email, &req.admin_password, &req.admin_name)
}

impl From<CreateTenantRequest> for NewTenant {
    fn from(req: CreateTenantRequest) -> Self {
        Self {
            name: req.name,
            slug: req.slug,
            config: req.config,
            admin: admin_account(req.admin_email, req.admin_password, req.admin_name),
        }
    }
}

impl From<UpdateTenantRequest> for TenantChanges {
    fn from(req: UpdateTenantRequest) -> Self {
        Self {
            name: req.name,
            slug: req.slug,
            active: req.active,
            config: req.config,
            admin: admin_account(req.admin_email, req.admin_password, req.admin_name),
        }
    }
}

/// Public onboarding. Answers 404 when public signup is switched off.
pub(crate) async fn onboard_tenant(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<CreateTenantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.settings.public_signup {
        return Err(api_not_found("public signup is disabled"));
    }
    let tenant = state.tenants.create(body.into()).await?;
    Ok(created(tenant))
}

pub(crate) async fn tenant_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(ok(state.tenants.get_by_slug(&slug).await?))
}

pub(crate) async fn list_tenants(
    State(state): State<AppState>,
    SuperAdmin(_): SuperAdmin,
    ValidQuery(query): ValidQuery<TenantListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = TenantFilter {
        active: flag_of(query.active.as_deref()),
        search: non_empty(query.search),
    };
    let pagination = page_of(query.page.as_deref(), query.limit.as_deref(), 10);
    Ok(paged(state.tenants.list(filter, pagination).await?))
}

pub(crate) async fn create_tenant(
    State(state): State<AppState>,
    SuperAdmin(_): SuperAdmin,
    ValidJson(body): ValidJson<CreateTenantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = state.tenants.create(body.into()).await?;
    Ok(created(tenant))
}

pub(crate) async fn get_tenant(
    State(state): State<AppState>,
    SuperAdmin(_): SuperAdmin,
    PathId(id): PathId,
) -> Result<impl IntoResponse, ApiError> {
    Ok(ok(state.tenants.get(id).await?))
}

pub(crate) async fn update_tenant(
    State(state): State<AppState>,
    SuperAdmin(_): SuperAdmin,
    PathId(id): PathId,
    ValidJson(body): ValidJson<UpdateTenantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(ok(state.tenants.update(id, body.into()).await?))
}

pub(crate) async fn deactivate_tenant(
    State(state): State<AppState>,
    SuperAdmin(_): SuperAdmin,
    PathId(id): PathId,
) -> Result<impl IntoResponse, ApiError> {
    Ok(ok(state.tenants.deactivate(id).await?))
}

pub(crate) async fn activate_tenant(
    State(state): State<AppState>,
    SuperAdmin(_): SuperAdmin,
    PathId(id): PathId,
) -> Result<impl IntoResponse, ApiError> {
    Ok(ok(state.tenants.activate(id).await?))
}
