use axum::extract::State;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::extract::{TenantScope, ValidQuery};
use crate::api::types::{number_of, ok};
use crate::app::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub month: Option<String>,
    pub year: Option<String>,
}

/// Month statistics; out-of-range or missing month/year mean the
/// current one.
pub(crate) async fn stats(
    State(state): State<AppState>,
    TenantScope(tenant_id): TenantScope,
    ValidQuery(query): ValidQuery<StatsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state
        .dashboard
        .stats(
            tenant_id,
            number_of(query.month.as_deref()),
            number_of(query.year.as_deref()),
        )
        .await?;
    Ok(ok(stats))
}
