//! Authentication configuration.

use crate::error::AuthError;

/// Configuration for the authentication service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret for HS256 access tokens. At least
    /// [`AuthConfig::MIN_SECRET_LEN`] bytes.
    pub jwt_secret: String,
    /// Access token lifetime in seconds (default: 604_800 = 7 days).
    pub access_token_lifetime_secs: u64,
    /// Refresh token lifetime in seconds (default: 2_592_000 = 30 days).
    pub refresh_token_lifetime_secs: u64,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// bcrypt work factor for passwords and integration tokens.
    pub bcrypt_cost: u32,
    /// Minimum password length accepted at registration.
    pub min_password_length: usize,
}

impl AuthConfig {
    pub const MIN_SECRET_LEN: usize = 32;

    /// Reject configurations the service must not start with.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.jwt_secret.len() < Self::MIN_SECRET_LEN {
            return Err(AuthError::Config(format!(
                "JWT secret must be at least {} bytes",
                Self::MIN_SECRET_LEN
            )));
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(AuthError::Config(format!(
                "bcrypt cost {} is outside 4..=31",
                self.bcrypt_cost
            )));
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_lifetime_secs: 604_800,
            refresh_token_lifetime_secs: 2_592_000,
            jwt_issuer: "dunning".into(),
            bcrypt_cost: 10,
            min_password_length: 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_secret_is_rejected() {
        let config = AuthConfig {
            jwt_secret: "too-short".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AuthError::Config(_))));
    }

    #[test]
    fn default_lifetimes() {
        let config = AuthConfig {
            jwt_secret: "x".repeat(32),
            ..Default::default()
        };
        config.validate().unwrap();
        assert_eq!(config.access_token_lifetime_secs, 7 * 24 * 3600);
        assert_eq!(config.refresh_token_lifetime_secs, 30 * 24 * 3600);
        assert_eq!(config.bcrypt_cost, 10);
    }
}
