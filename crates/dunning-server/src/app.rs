//! HTTP application wiring: shared state, middleware and routes.

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderName, Method, header};
use axum::middleware;
use axum::routing::{get, patch, post};
use dunning_auth::{AuthConfig, AuthService, Authenticator, IntegrationTokenService};
use dunning_billing::{ChargeService, CustomerService, DashboardService, MessageService, TenantService};
use dunning_db::repository::{
    SurrealChargeRepository, SurrealCustomerRepository, SurrealMessageRepository,
    SurrealRefreshTokenRepository, SurrealTenantRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::api::error::{api_not_found, set_expose_internal_details};

type Users = SurrealUserRepository<Any>;
type Tenants = SurrealTenantRepository<Any>;
type RefreshTokens = SurrealRefreshTokenRepository<Any>;
type Customers = SurrealCustomerRepository<Any>;
type Charges = SurrealChargeRepository<Any>;
type Messages = SurrealMessageRepository<Any>;

/// Behaviour switches that are not part of any service.
#[derive(Debug, Clone, Copy)]
pub struct ApiSettings {
    pub public_signup: bool,
    /// Echo internal error causes in 500 responses.
    pub expose_internal_errors: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService<Users, Tenants, RefreshTokens>>,
    pub authenticator: Arc<Authenticator<Users, Tenants>>,
    pub integrations: Arc<IntegrationTokenService<Tenants>>,
    pub tenants: Arc<TenantService<Tenants, Users>>,
    pub customers: Arc<CustomerService<Customers, Charges>>,
    pub charges: Arc<ChargeService<Charges, Customers, Messages>>,
    pub messages: Arc<MessageService<Messages, Customers, Charges>>,
    pub dashboard: Arc<DashboardService<Charges>>,
    pub settings: ApiSettings,
}

impl AppState {
    /// Wire every service over one database handle.
    pub fn new(db: Surreal<Any>, auth_config: AuthConfig, settings: ApiSettings) -> Self {
        let users = SurrealUserRepository::new(db.clone());
        let tenants = SurrealTenantRepository::new(db.clone());
        let refresh_tokens = SurrealRefreshTokenRepository::new(db.clone());
        let customers = SurrealCustomerRepository::new(db.clone());
        let charges = SurrealChargeRepository::new(db.clone());
        let messages = SurrealMessageRepository::new(db);

        Self {
            integrations: Arc::new(IntegrationTokenService::new(
                tenants.clone(),
                auth_config.bcrypt_cost,
            )),
            authenticator: Arc::new(Authenticator::new(
                users.clone(),
                tenants.clone(),
                auth_config.clone(),
            )),
            tenants: Arc::new(TenantService::new(tenants.clone(), users.clone(), &auth_config)),
            auth: Arc::new(AuthService::new(users, tenants, refresh_tokens, auth_config)),
            customers: Arc::new(CustomerService::new(customers.clone(), charges.clone())),
            charges: Arc::new(ChargeService::new(
                charges.clone(),
                customers.clone(),
                messages.clone(),
            )),
            messages: Arc::new(MessageService::new(messages, customers, charges.clone())),
            dashboard: Arc::new(DashboardService::new(charges)),
            settings,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    set_expose_internal_details(state.settings.expose_internal_errors);

    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            )
        });

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-api-token"),
        ]);

    Router::new()
        .route("/health", get(api::system::health))
        // Auth
        .route("/api/auth/login", post(api::auth::login))
        .route("/api/auth/register", post(api::auth::register))
        .route("/api/auth/refresh", post(api::auth::refresh))
        .route("/api/auth/logout", post(api::auth::logout))
        .route("/api/auth/me", get(api::auth::me))
        // Integration tokens
        .route(
            "/api/integrations/token",
            post(api::integrations::generate_token).delete(api::integrations::revoke_token),
        )
        // Tenants
        .route("/api/tenants", post(api::tenants::onboard_tenant))
        .route("/api/tenants/slug/{slug}", get(api::tenants::tenant_by_slug))
        .route(
            "/api/admin/tenants",
            get(api::tenants::list_tenants).post(api::tenants::create_tenant),
        )
        .route(
            "/api/admin/tenants/{id}",
            get(api::tenants::get_tenant)
                .put(api::tenants::update_tenant)
                .delete(api::tenants::deactivate_tenant),
        )
        .route(
            "/api/admin/tenants/{id}/activate",
            patch(api::tenants::activate_tenant),
        )
        // Customers
        .route(
            "/api/customers",
            get(api::customers::list_customers).post(api::customers::create_customer),
        )
        .route(
            "/api/customers/{id}",
            get(api::customers::get_customer)
                .put(api::customers::update_customer)
                .delete(api::customers::deactivate_customer),
        )
        .route(
            "/api/customers/{id}/activate",
            patch(api::customers::activate_customer),
        )
        // Charges
        .route(
            "/api/charges",
            get(api::charges::list_charges).post(api::charges::create_charge),
        )
        .route("/api/charges/due-today", get(api::charges::due_today))
        .route("/api/charges/overdue", get(api::charges::overdue))
        .route("/api/charges/summary", get(api::charges::summary))
        .route(
            "/api/charges/{id}",
            get(api::charges::get_charge).put(api::charges::update_charge),
        )
        .route("/api/charges/{id}/pay", patch(api::charges::mark_paid))
        // Messages
        .route(
            "/api/messages",
            get(api::messages::list_messages).post(api::messages::create_message),
        )
        .route(
            "/api/messages/{id}",
            get(api::messages::get_message)
                .put(api::messages::update_message)
                .patch(api::messages::update_message),
        )
        // Dashboard
        .route("/api/dashboard/stats", get(api::dashboard::stats))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api::middleware::authenticate,
        ))
        .fallback(|| async { api_not_found("route not found") })
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}
