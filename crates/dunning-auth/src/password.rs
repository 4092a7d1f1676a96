//! Password hashing and verification using bcrypt.
//!
//! bcrypt only considers the first 72 bytes of its input.

use crate::error::AuthError;

/// Hash a secret with a fresh random salt.
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(password, cost).map_err(|e| AuthError::Crypto(format!("bcrypt hash: {e}")))
}

/// Verify a plaintext secret against a stored bcrypt hash.
///
/// Returns `Ok(true)` on match, `Ok(false)` on mismatch, or
/// `Err(AuthError::Crypto)` if the stored hash is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash).map_err(|e| AuthError::Crypto(format!("bcrypt verify: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_password_verifies() {
        let hash = hash_password("segredo-123", 4).unwrap();
        assert!(verify_password("segredo-123", &hash).unwrap());
    }

    #[test]
    fn wrong_password_fails() {
        let hash = hash_password("segredo-123", 4).unwrap();
        assert!(!verify_password("segredo-124", &hash).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("segredo-123", 4).unwrap();
        let b = hash_password("segredo-123", 4).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_is_an_error() {
        let result = verify_password("anything", "not-a-bcrypt-hash");
        assert!(matches!(result, Err(AuthError::Crypto(_))));
    }
}
