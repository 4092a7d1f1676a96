//! JWT access token issuance/verification, opaque refresh token
//! generation and integration token material.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use dunning_core::models::user::{Role, User};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// Prefix every integration token starts with.
pub const INTEGRATION_TOKEN_PREFIX: &str = "api_";

/// JWT claims embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenClaims {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    /// Serialized as `null` for super-administrators.
    pub tenant_id: Option<Uuid>,
    /// Issuer.
    pub iss: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Unique token ID.
    pub jti: String,
}

/// Issue a signed HS256 JWT access token for `user`.
pub fn issue_access_token(user: &User, config: &AuthConfig) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let claims = AccessTokenClaims {
        user_id: user.id,
        email: user.email.clone(),
        role: user.role,
        tenant_id: user.tenant_id,
        iss: config.jwt_issuer.clone(),
        iat: now,
        exp: now + config.access_token_lifetime_secs as i64,
        jti: Uuid::new_v4().to_string(),
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

/// Decode and verify an HS256 JWT access token.
///
/// Signature, expiry and issuer are checked; a token without a
/// `userId` claim fails to decode.
pub fn decode_access_token(
    token: &str,
    config: &AuthConfig,
) -> Result<AccessTokenClaims, AuthError> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.jwt_issuer]);
    validation.set_required_spec_claims(&["exp", "iat", "iss"]);

    jsonwebtoken::decode::<AccessTokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })
}

/// Generate an opaque refresh token: 64 random bytes, hex-encoded.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 64];
    rand::rng().fill(&mut bytes[..]);
    hex::encode(bytes)
}

/// SHA-256 hash of a raw refresh token, hex-encoded.
///
/// This is the value stored as `refresh_token.token_hash`.
pub fn hash_refresh_token(raw: &str) -> String {
    sha256_hex(raw)
}

/// Digest of a full integration token, used as the bcrypt input.
///
/// The token is longer than the 72 bytes bcrypt reads; the 64-char
/// digest fits, so every byte of the token is bound by the hash.
pub fn integration_token_digest(token: &str) -> String {
    sha256_hex(token)
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a fresh integration token.
///
/// Returns `(token_id, full_token)` where the token is
/// `api_<uuid hex>.<base64url of 32 random bytes>` and `token_id` is
/// the part before the dot.
pub fn generate_integration_token() -> (String, String) {
    let token_id = format!("{INTEGRATION_TOKEN_PREFIX}{}", Uuid::new_v4().simple());
    let mut secret = [0u8; INTEGRATION_SECRET_BYTES];
    rand::rng().fill(&mut secret[..]);
    let token = format!("{token_id}.{}", URL_SAFE_NO_PAD.encode(secret));
    (token_id, token)
}

const INTEGRATION_SECRET_BYTES: usize = 32;
/// Unpadded base64url length of the secret.
const INTEGRATION_SECRET_LEN: usize = 43;
const INTEGRATION_ID_HEX_LEN: usize = 32;

/// Split an integration token into its public id, checking its shape.
///
/// Both halves must have exactly the generated length and alphabet.
pub fn integration_token_id(token: &str) -> Result<&str, AuthError> {
    let Some(hex_part) = token.strip_prefix(INTEGRATION_TOKEN_PREFIX) else {
        return Err(AuthError::IntegrationTokenInvalid("wrong prefix"));
    };
    let Some((id_hex, secret)) = hex_part.split_once('.') else {
        return Err(AuthError::IntegrationTokenInvalid("malformed token"));
    };

    let id_ok = id_hex.len() == INTEGRATION_ID_HEX_LEN
        && id_hex.bytes().all(|b| b.is_ascii_hexdigit());
    let secret_ok = secret.len() == INTEGRATION_SECRET_LEN
        && secret
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if !id_ok || !secret_ok {
        return Err(AuthError::IntegrationTokenInvalid("malformed token"));
    }

    Ok(&token[..INTEGRATION_TOKEN_PREFIX.len() + INTEGRATION_ID_HEX_LEN])
}
