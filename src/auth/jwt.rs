/// JWT Token Codec
///
/// Signs claims into compact JWS strings and verifies them back. The codec
/// is type-agnostic: it never decides whether an access or a refresh token
/// is acceptable, that is the engine's job.

use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::{Claims, TokenSubject, TokenType};
use crate::configuration::JwtSettings;
use crate::error::{AuthError, ConfigError};

/// Signing and verification keys, loaded once at startup
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    issuer: String,
}

impl TokenCodec {
    /// HS256 codec backed by a shared secret
    pub fn hmac(secret: &[u8], issuer: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
            issuer: issuer.into(),
        }
    }

    /// RS256 codec backed by a PEM-encoded key pair
    pub fn rsa_pem(
        private_pem: &[u8],
        public_pem: &[u8],
        issuer: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_pem)
            .map_err(|e| ConfigError::ParseError(format!("failed to parse private key: {}", e)))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem)
            .map_err(|e| ConfigError::ParseError(format!("failed to parse public key: {}", e)))?;

        Ok(Self {
            encoding_key,
            decoding_key,
            algorithm: Algorithm::RS256,
            issuer: issuer.into(),
        })
    }

    /// Build the codec described by `config`
    ///
    /// A configured key pair wins over a shared secret.
    pub fn from_settings(config: &JwtSettings) -> Result<Self, ConfigError> {
        match (&config.private_key_path, &config.public_key_path) {
            (Some(private_path), Some(public_path)) => {
                let private_pem = read_key(private_path)?;
                let public_pem = read_key(public_path)?;
                tracing::info!(algorithm = "RS256", "Token codec initialized");
                Self::rsa_pem(&private_pem, &public_pem, config.issuer.clone())
            }
            (Some(_), None) | (None, Some(_)) => Err(ConfigError::MissingRequired(
                "jwt.private_key_path and jwt.public_key_path must be set together".to_string(),
            )),
            (None, None) => {
                let secret = config
                    .secret
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| ConfigError::MissingRequired("jwt.secret".to_string()))?;
                tracing::info!(algorithm = "HS256", "Token codec initialized");
                Ok(Self::hmac(secret.as_bytes(), config.issuer.clone()))
            }
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Mint and sign a token of `token_type` for `subject`, valid for `ttl`
    pub fn encode(
        &self,
        subject: &TokenSubject,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        tracing::debug!(username = %subject.username, token_type = %token_type, "Generating token");
        let claims = Claims::new(subject, token_type, ttl, &self.issuer);
        self.encode_claims(&claims)
    }

    /// Sign already-built claims
    pub fn encode_claims(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(self.algorithm), claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, "Token signing failed");
            AuthError::SigningFailure(e.to_string())
        })
    }

    /// Verify the signature and decode the claims
    ///
    /// # Errors
    /// - `TokenExpired` for a well-signed token past `exp`
    /// - `SignatureInvalid` for a forged token or an unexpected algorithm
    /// - `TokenMalformed` for anything that does not parse, or a foreign issuer
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                // Only the error kind is logged, never the token itself
                let err = classify(e.kind());
                tracing::debug!(kind = ?e.kind(), error = %err, "Token rejected");
                err
            })
    }
}

fn classify(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::SignatureInvalid,
        _ => AuthError::TokenMalformed,
    }
}

fn read_key(path: &str) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|e| {
        tracing::error!(path = %path, error = %e, "Failed to read key file");
        ConfigError::InvalidValue(format!("failed to read key {}: {}", path, e))
    })
}
