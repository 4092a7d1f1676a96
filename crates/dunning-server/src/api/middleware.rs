//! Request authentication middleware.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use dunning_auth::RequestCredentials;

use crate::api::error::ApiError;
use crate::app::AppState;

pub const API_TOKEN_HEADER: &str = "x-api-token";

/// Resolve the caller and attach its `AuthContext` to the request.
/// Public routes pass through without one.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (credentials, method, path) = {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        let credentials = RequestCredentials {
            authorization: header(AUTHORIZATION.as_str()),
            api_token: header(API_TOKEN_HEADER),
        };
        (
            credentials,
            req.method().as_str().to_owned(),
            req.uri().path().to_owned(),
        )
    };

    let context = state
        .authenticator
        .authenticate(&method, &path, &credentials)
        .await?;
    if let Some(context) = context {
        tracing::debug!(%method, %path, tenant_id = ?context.tenant_id(), "Request authenticated");
        req.extensions_mut().insert(context);
    }
    Ok(next.run(req).await)
}
