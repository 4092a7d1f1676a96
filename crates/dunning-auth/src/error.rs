//! Authentication error types.

use dunning_core::error::DunningError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user inactive")]
    AccountInactive,

    #[error("tenant inactive")]
    TenantInactive,

    #[error("token not provided")]
    TokenMissing,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("refresh token invalid")]
    RefreshTokenInvalid,

    #[error("refresh token expired")]
    RefreshTokenExpired,

    #[error("invalid integration token: {0}")]
    IntegrationTokenInvalid(&'static str),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for DunningError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::IntegrationTokenInvalid(_) => DunningError::Validation {
                message: err.to_string(),
            },
            AuthError::Config(msg) => DunningError::Internal(msg),
            AuthError::Crypto(msg) => DunningError::Crypto(msg),
            other => DunningError::AuthenticationFailed {
                reason: other.to_string(),
            },
        }
    }
}
