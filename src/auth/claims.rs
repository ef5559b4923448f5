/// JWT Claims structure
///
/// Typed payload carried by both access and refresh tokens. Required
/// fields are checked explicitly after decoding instead of being read out
/// of an untyped claim map.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

/// Which kind of bearer token a set of claims belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity fields embedded in every token
///
/// `id` is an opaque string handle: UUIDs and numeric ids are both
/// carried in their textual form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub id: String,
    pub username: String,
    pub role: String,
}

/// JWT claims for access and refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub token_type: TokenType,
    /// Subject (identity handle)
    #[serde(default)]
    pub sub: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub role: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Unique token id, keeps tokens minted in the same second distinct
    pub jti: String,
    pub iss: String,
}

impl Claims {
    /// Create claims for `subject` valid for `ttl` from now
    pub fn new(subject: &TokenSubject, token_type: TokenType, ttl: Duration, issuer: &str) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            token_type,
            sub: subject.id.clone(),
            username: subject.username.clone(),
            role: subject.role.clone(),
            iat: now,
            exp: now.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)),
            jti: Uuid::new_v4().to_string(),
            iss: issuer.to_string(),
        }
    }

    /// Reject claims minted for another kind of token
    pub fn expect_type(&self, expected: TokenType) -> Result<(), AuthError> {
        if self.token_type != expected {
            return Err(AuthError::WrongTokenType { expected });
        }
        Ok(())
    }

    /// Extract the identity, failing when a required field is empty
    pub fn subject(&self) -> Result<TokenSubject, AuthError> {
        if self.username.is_empty() {
            return Err(AuthError::MalformedClaims("username"));
        }
        if self.sub.is_empty() {
            return Err(AuthError::MalformedClaims("user_id"));
        }

        Ok(TokenSubject {
            id: self.sub.clone(),
            username: self.username.clone(),
            role: self.role.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> TokenSubject {
        TokenSubject {
            id: "3410a4f3-a0b0-432a-89ba-9ea9ba48c6c1".to_string(),
            username: "alice".to_string(),
            role: "user".to_string(),
        }
    }

    #[test]
    fn test_claims_creation() {
        let claims = Claims::new(&alice(), TokenType::Access, Duration::from_secs(900), "test");

        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.sub, alice().id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, 900);
        assert_eq!(claims.iss, "test");
    }

    #[test]
    fn test_each_token_gets_a_fresh_id() {
        let a = Claims::new(&alice(), TokenType::Refresh, Duration::from_secs(60), "test");
        let b = Claims::new(&alice(), TokenType::Refresh, Duration::from_secs(60), "test");

        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_expect_type() {
        let claims = Claims::new(&alice(), TokenType::Access, Duration::from_secs(60), "test");

        assert!(claims.expect_type(TokenType::Access).is_ok());
        assert!(matches!(
            claims.expect_type(TokenType::Refresh),
            Err(AuthError::WrongTokenType { expected: TokenType::Refresh })
        ));
    }

    #[test]
    fn test_missing_identity_fields() {
        let mut claims = Claims::new(&alice(), TokenType::Refresh, Duration::from_secs(60), "test");
        claims.username.clear();
        assert!(matches!(claims.subject(), Err(AuthError::MalformedClaims("username"))));

        let mut claims = Claims::new(&alice(), TokenType::Refresh, Duration::from_secs(60), "test");
        claims.sub.clear();
        assert!(matches!(claims.subject(), Err(AuthError::MalformedClaims("user_id"))));
    }

    #[test]
    fn test_token_type_wire_format() {
        let json = serde_json::to_string(&TokenType::Refresh).unwrap();
        assert_eq!(json, "\"refresh\"");
        assert_eq!(TokenType::Access.to_string(), "access");
    }

    #[test]
    fn test_payload_without_role_still_parses() {
        let payload = serde_json::json!({
            "token_type": "refresh",
            "sub": "42",
            "username": "bob",
            "iat": 1,
            "exp": 2,
            "jti": "x",
            "iss": "test"
        });
        let claims: Claims = serde_json::from_value(payload).unwrap();

        assert_eq!(claims.role, "");
        assert_eq!(claims.subject().unwrap().id, "42");
    }
}
