//! Dunning Auth: password verification, session token issuance,
//! per-tenant integration tokens and request authentication.

pub mod authenticator;
pub mod config;
pub mod error;
pub mod integration;
pub mod password;
pub mod service;
pub mod token;

pub use authenticator::{AuthContext, Authenticator, Principal, RequestCredentials, RouteAccess};
pub use config::AuthConfig;
pub use error::AuthError;
pub use integration::IntegrationTokenService;
pub use service::{AuthService, LoginInput, LoginOutput, RegisterInput, TokenPair};
pub use token::AccessTokenClaims;
