//! User records consumed by the token engine.
//!
//! The engine only ever reads an `Identity`; creation exists for sign-up.

mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::TokenSubject;
use crate::error::AuthError;

pub use postgres::PostgresUserStore;

/// Role assigned to accounts created through sign-up
pub const DEFAULT_ROLE: &str = "user";

/// A stored user as seen by the token engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Opaque identity handle (UUID text for the Postgres store)
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

impl Identity {
    pub fn subject(&self) -> TokenSubject {
        TokenSubject {
            id: self.id.clone(),
            username: self.username.clone(),
            role: self.role.clone(),
        }
    }
}

/// A user to be inserted; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("user not found")]
    NotFound,

    /// A unique field (`username` or `email`) is already taken
    #[error("{0} already exists")]
    AlreadyExists(&'static str),

    #[error("database error: {0}")]
    Database(String),
}

impl From<UserStoreError> for AuthError {
    fn from(err: UserStoreError) -> Self {
        match err {
            UserStoreError::NotFound => AuthError::UserNotFound,
            UserStoreError::AlreadyExists("email") => AuthError::EmailAlreadyUsed,
            UserStoreError::AlreadyExists(_) => AuthError::UserAlreadyExists,
            UserStoreError::Database(msg) => AuthError::UserStore(msg),
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Identity, UserStoreError>;

    /// Insert a user and return its identity handle
    async fn create(&self, user: NewUser) -> Result<String, UserStoreError>;
}
