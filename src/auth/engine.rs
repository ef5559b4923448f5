/// Token Lifecycle Engine
///
/// Issues, rotates and revokes access/refresh token pairs.
///
/// A refresh token moves through `ISSUED -> ACTIVE -> {ROTATED | REVOKED | EXPIRED}`.
/// Liveness is tracked only in the session cache, so the engine itself is
/// stateless and can run on any number of instances.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::auth::claims::{Claims, TokenSubject, TokenType};
use crate::auth::jwt::TokenCodec;
use crate::auth::password::{hash_password, verify_password};
use crate::error::AuthError;
use crate::session_cache::{DeleteOutcome, ReplaceOutcome, SessionCache, SessionStatus};
use crate::user_store::{NewUser, UserStore, DEFAULT_ROLE};

/// Access/refresh pair handed to the transport layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Lifetimes of the two token kinds
#[derive(Debug, Clone, Copy)]
pub struct TokenTtls {
    pub access: Duration,
    pub refresh: Duration,
}

pub struct TokenEngine {
    codec: TokenCodec,
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionCache>,
    ttls: TokenTtls,
}

impl TokenEngine {
    pub fn new(
        codec: TokenCodec,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionCache>,
        ttls: TokenTtls,
    ) -> Self {
        Self {
            codec,
            users,
            sessions,
            ttls,
        }
    }

    pub fn ttls(&self) -> TokenTtls {
        self.ttls
    }

    /// Create an account and return its identity handle
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<String, AuthError> {
        let password_hash = hash_password(password)?;

        let id = self
            .users
            .create(NewUser {
                username: username.to_string(),
                password_hash,
                email: email.to_string(),
                role: DEFAULT_ROLE.to_string(),
            })
            .await?;

        tracing::info!(user_id = %id, username = %username, "User registered");
        Ok(id)
    }

    /// Verify credentials and issue a fresh token pair
    ///
    /// The refresh token is only returned once it is stored in the session
    /// cache; on a cache failure both signed tokens are dropped.
    pub async fn issue(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let identity = self.users.find_by_username(username).await.map_err(|e| {
            let err = AuthError::from(e);
            if matches!(err, AuthError::UserNotFound) {
                tracing::info!(username = %username, "Login for unknown user");
            }
            err
        })?;

        verify_password(password, &identity.password_hash).map_err(|e| {
            let err = AuthError::from(e);
            if matches!(err, AuthError::InvalidCredentials) {
                tracing::info!(username = %username, "Login with wrong password");
            }
            err
        })?;

        let pair = self.mint_pair(&identity.subject())?;

        self.sessions
            .put(&pair.refresh_token, self.ttls.refresh)
            .await
            .map_err(AuthError::TokenPersistenceFailure)?;

        tracing::info!(user_id = %identity.id, username = %identity.username, "Tokens issued");
        Ok(pair)
    }

    /// Exchange a live refresh token for a new pair, consuming the old one
    ///
    /// Identity fields are copied from the presented token, not re-read
    /// from the user store.
    ///
    /// # Errors
    /// - `TokenExpired`, `TokenMalformed`, `SignatureInvalid` from decoding
    /// - `WrongTokenType` for an access token
    /// - `MalformedClaims` when the identity fields are missing
    /// - `TokenNotRecognized` when the token is not live in the cache,
    ///   including when a concurrent refresh consumed it first
    /// - `TokenRotationFailure` when the cache write fails; the old token
    ///   stays the valid one
    pub async fn refresh(&self, old_refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.codec.decode(old_refresh_token)?;
        claims.expect_type(TokenType::Refresh)?;
        let subject = claims.subject()?;

        match self
            .sessions
            .is_active(old_refresh_token)
            .await
            .map_err(AuthError::CacheReadFailure)?
        {
            SessionStatus::Active => {}
            SessionStatus::Absent => {
                tracing::info!(user_id = %subject.id, "Refresh with unknown or consumed token");
                return Err(AuthError::TokenNotRecognized);
            }
        }

        let pair = self.mint_pair(&subject)?;

        let outcome = self
            .sessions
            .atomic_replace(old_refresh_token, &pair.refresh_token, self.ttls.refresh)
            .await
            .map_err(AuthError::TokenRotationFailure)?;

        match outcome {
            ReplaceOutcome::Replaced => {
                tracing::debug!(user_id = %subject.id, username = %subject.username, "Tokens refreshed");
                Ok(pair)
            }
            ReplaceOutcome::OldAbsent => {
                // Lost a race against another refresh of the same token
                tracing::warn!(user_id = %subject.id, "Concurrent refresh lost the rotation");
                Err(AuthError::TokenNotRecognized)
            }
        }
    }

    /// Drop a refresh token from the session cache
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError> {
        match self
            .sessions
            .delete(refresh_token)
            .await
            .map_err(AuthError::CacheWriteFailure)?
        {
            DeleteOutcome::Deleted => {
                tracing::debug!("Refresh token revoked");
                Ok(())
            }
            DeleteOutcome::Absent => {
                tracing::warn!("Revoke of a refresh token that is not live");
                Err(AuthError::TokenNotFound)
            }
        }
    }

    /// Validate an access token without touching the cache
    pub fn authenticate(&self, access_token: &str) -> Result<Claims, AuthError> {
        let claims = self.codec.decode(access_token)?;
        claims.expect_type(TokenType::Access)?;
        claims.subject()?;
        Ok(claims)
    }

    fn mint_pair(&self, subject: &TokenSubject) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.codec.encode(subject, TokenType::Access, self.ttls.access)?,
            refresh_token: self.codec.encode(subject, TokenType::Refresh, self.ttls.refresh)?,
        })
    }
}
