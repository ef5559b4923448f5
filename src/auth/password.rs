/// Password Hashing and Verification
///
/// Salted bcrypt hashes; the salt and cost are embedded in the output.

use bcrypt::{hash, verify, DEFAULT_COST};
use thiserror::Error;

use crate::error::AuthError;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential mismatch")]
    Mismatch,

    #[error("password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}

impl From<CredentialError> for AuthError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Mismatch => AuthError::InvalidCredentials,
            CredentialError::Hashing(e) => AuthError::HashingFailure(e.to_string()),
        }
    }
}

/// Hash a password using bcrypt with the default cost
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    hash_password_with_cost(password, DEFAULT_COST)
}

/// Hash a password using bcrypt with an explicit cost factor
pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, CredentialError> {
    hash(password, cost).map_err(|e| {
        tracing::error!(error = %e, "Password hashing failed");
        CredentialError::Hashing(e)
    })
}

/// Verify a password against its hash
///
/// # Errors
/// - `Mismatch` if the password does not match
/// - `Hashing` if the stored hash cannot be parsed
pub fn verify_password(password: &str, hash: &str) -> Result<(), CredentialError> {
    match verify(password, hash)? {
        true => Ok(()),
        false => Err(CredentialError::Mismatch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let password = "ValidPassword123";
        let hash = hash_password(password).expect("Failed to hash password");

        assert_ne!(password, hash);
        // Hash should start with bcrypt identifier
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password_with_cost("password123", 4).unwrap();
        let b = hash_password_with_cost("password123", 4).unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password_with_cost("password123", 4).unwrap();

        assert!(verify_password("password123", &hash).is_ok());
    }

    #[test]
    fn test_verify_wrong_password() {
        let hash = hash_password_with_cost("password123", 4).unwrap();

        assert!(matches!(
            verify_password("password124", &hash),
            Err(CredentialError::Mismatch)
        ));
    }

    #[test]
    fn test_corrupt_hash_is_a_hashing_failure() {
        let result = verify_password("password123", "not-a-bcrypt-hash");

        assert!(matches!(result, Err(CredentialError::Hashing(_))));
        let err: AuthError = result.unwrap_err().into();
        assert!(matches!(err, AuthError::HashingFailure(_)));
    }

    #[test]
    fn test_mismatch_maps_to_invalid_credentials() {
        let err: AuthError = CredentialError::Mismatch.into();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }
}
