/// Error Handling Module
///
/// Two layers:
/// 1. `AuthError` - the token lifecycle taxonomy returned by the engine,
///    the codec, the credential verifier and the stores
/// 2. `AppError` - the HTTP-facing error that maps the taxonomy onto
///    status codes and a structured JSON body, with structured logging

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

use crate::auth::TokenType;
use crate::session_cache::SessionCacheError;

/// ============================================================================
/// 1. TOKEN LIFECYCLE TAXONOMY
/// ============================================================================

/// Errors produced while issuing, rotating, validating or revoking tokens
#[derive(Debug, Error)]
pub enum AuthError {
    // Credential errors
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user not found")]
    UserNotFound,

    // Account conflicts (sign-up)
    #[error("user already exists")]
    UserAlreadyExists,

    #[error("email already used")]
    EmailAlreadyUsed,

    // Token format errors
    #[error("token malformed")]
    TokenMalformed,

    #[error("token signature invalid")]
    SignatureInvalid,

    #[error("invalid token type (need {expected})")]
    WrongTokenType { expected: TokenType },

    #[error("missing {0} in token payload")]
    MalformedClaims(&'static str),

    // Token lifecycle errors
    #[error("token has expired")]
    TokenExpired,

    #[error("token not recognized")]
    TokenNotRecognized,

    #[error("token not found")]
    TokenNotFound,

    // Persistence errors
    #[error("failed to save refresh token")]
    TokenPersistenceFailure(#[source] SessionCacheError),

    #[error("failed to rotate refresh token")]
    TokenRotationFailure(#[source] SessionCacheError),

    #[error("failed to write session cache")]
    CacheWriteFailure(#[source] SessionCacheError),

    #[error("failed to read session cache")]
    CacheReadFailure(#[source] SessionCacheError),

    #[error("user store error: {0}")]
    UserStore(String),

    // Cryptographic failures
    #[error("password hashing failed: {0}")]
    HashingFailure(String),

    #[error("token signing failed: {0}")]
    SigningFailure(String),
}

/// Coarse classification of an `AuthError`, used for status mapping and log severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    Credential,
    Conflict,
    TokenFormat,
    TokenLifecycle,
    Persistence,
    Internal,
}

impl AuthError {
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            AuthError::InvalidCredentials | AuthError::UserNotFound => AuthErrorKind::Credential,
            AuthError::UserAlreadyExists | AuthError::EmailAlreadyUsed => AuthErrorKind::Conflict,
            AuthError::TokenMalformed
            | AuthError::SignatureInvalid
            | AuthError::WrongTokenType { .. }
            | AuthError::MalformedClaims(_) => AuthErrorKind::TokenFormat,
            AuthError::TokenExpired | AuthError::TokenNotRecognized | AuthError::TokenNotFound => {
                AuthErrorKind::TokenLifecycle
            }
            AuthError::TokenPersistenceFailure(_)
            | AuthError::TokenRotationFailure(_)
            | AuthError::CacheWriteFailure(_)
            | AuthError::CacheReadFailure(_)
            | AuthError::UserStore(_) => AuthErrorKind::Persistence,
            AuthError::HashingFailure(_) | AuthError::SigningFailure(_) => AuthErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
            AuthError::UserAlreadyExists | AuthError::EmailAlreadyUsed => StatusCode::CONFLICT,
            AuthError::WrongTokenType { .. } => StatusCode::FORBIDDEN,
            AuthError::TokenNotFound => StatusCode::NOT_FOUND,
            _ => match self.kind() {
                AuthErrorKind::TokenFormat | AuthErrorKind::TokenLifecycle => StatusCode::UNAUTHORIZED,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            // Same code for both so a caller cannot probe for usernames
            AuthError::InvalidCredentials | AuthError::UserNotFound => "INVALID_CREDENTIALS",
            AuthError::UserAlreadyExists => "USER_ALREADY_EXISTS",
            AuthError::EmailAlreadyUsed => "EMAIL_ALREADY_USED",
            AuthError::TokenMalformed
            | AuthError::SignatureInvalid
            | AuthError::MalformedClaims(_) => "TOKEN_INVALID",
            AuthError::WrongTokenType { .. } => "INVALID_TOKEN_TYPE",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::TokenNotRecognized => "TOKEN_NOT_RECOGNIZED",
            AuthError::TokenNotFound => "TOKEN_NOT_FOUND",
            AuthError::TokenPersistenceFailure(_)
            | AuthError::TokenRotationFailure(_)
            | AuthError::CacheWriteFailure(_)
            | AuthError::CacheReadFailure(_) => "TRY_AGAIN_LATER",
            AuthError::UserStore(_) => "DATABASE_ERROR",
            AuthError::HashingFailure(_) | AuthError::SigningFailure(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to hand to an HTTP client
    fn public_message(&self) -> String {
        match self.kind() {
            AuthErrorKind::Credential => "invalid username or password".to_string(),
            AuthErrorKind::Persistence => "try again later".to_string(),
            AuthErrorKind::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// ============================================================================
/// 2. INPUT AND CONFIGURATION ERRORS
/// ============================================================================

/// Validation errors for request bodies
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is required", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} must be at least {} characters", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} must be at most {} characters", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
        }
    }
}

impl StdError for ValidationError {}

/// Configuration errors detected while assembling the service
#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
    ParseError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Config parse error: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

/// ============================================================================
/// 3. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type returned by HTTP handlers
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Auth(AuthError),
    Config(ConfigError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

// ============================================================================
// 4. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = match self {
            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR".to_string(),
                e.to_string(),
            ),
            AppError::Auth(e) => (e.status_code(), e.error_code().to_string(), e.public_message()),
            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR".to_string(),
                "Server configuration error".to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR".to_string(),
                "Internal server error".to_string(),
            ),
        };

        let error_response =
            ErrorResponse::new(request_id.to_string(), message, code, status.as_u16());

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Auth(e) => match e.kind() {
                AuthErrorKind::Credential => {
                    tracing::warn!(request_id = request_id, error = %e, "Invalid credentials attempt");
                }
                AuthErrorKind::Conflict => {
                    tracing::warn!(request_id = request_id, error = %e, "Duplicate account attempt");
                }
                AuthErrorKind::TokenFormat => {
                    tracing::warn!(request_id = request_id, error = %e, "Rejected token");
                }
                // Expected steady-state outcomes, never alert on these
                AuthErrorKind::TokenLifecycle => {
                    tracing::info!(request_id = request_id, error = %e, "Token lifecycle rejection");
                }
                AuthErrorKind::Persistence | AuthErrorKind::Internal => {
                    let source = StdError::source(e).map(|s| s.to_string());
                    tracing::error!(
                        request_id = request_id,
                        error = %e,
                        source = ?source,
                        "Authentication infrastructure error"
                    );
                }
            },
            AppError::Config(e) => {
                tracing::error!(request_id = request_id, error = %e, "Configuration error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

/// Implement ResponseError for Actix-web integration
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(e) => e.status_code(),
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ============================================================================
// 5. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Per-request context attached to log lines emitted by handlers
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub username: Option<String>,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            username: None,
            operation: operation.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn log_error(&self, error: &AppError) {
        let context = serde_json::json!({
            "request_id": self.request_id,
            "operation": self.operation,
            "username": self.username,
            "timestamp": self.timestamp.to_rfc3339(),
        });

        match error {
            AppError::Validation(_) => {
                tracing::warn!(error = %error, context = ?context, "Validation error");
            }
            AppError::Auth(e) if matches!(e.kind(), AuthErrorKind::Persistence | AuthErrorKind::Internal) => {
                tracing::error!(error = %error, context = ?context, "Authentication error");
            }
            AppError::Auth(_) => {
                tracing::warn!(error = %error, context = ?context, "Authentication error");
            }
            AppError::Config(_) | AppError::Internal(_) => {
                tracing::error!(error = %error, context = ?context, "Internal error");
            }
        }
    }
}
