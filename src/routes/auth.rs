/// Authentication Routes
///
/// Thin HTTP bindings over the token engine: sign-up, login, refresh,
/// revoke and the current-user lookup.

use actix_web::cookie::{time, Cookie};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::auth::{Claims, TokenEngine, TokenPair};
use crate::error::{AppError, ErrorContext, ValidationError};
use crate::validators::{validate_email, validate_password, validate_username};

/// User registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Token refresh request
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Query string of the revoke endpoint
#[derive(Deserialize)]
pub struct RevokeQuery {
    pub refresh_token: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub id: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub role: String,
}

/// POST /api/v1/auth/register
///
/// # Errors
/// - 400: invalid username, password or email
/// - 409: username or email already taken
/// - 500: hashing or database failure
pub async fn register(
    form: web::Json<RegisterRequest>,
    engine: web::Data<TokenEngine>,
) -> Result<HttpResponse, AppError> {
    let username = validate_username(&form.username)?;
    let password = validate_password(&form.password)?;
    let email = validate_email(&form.email)?;
    let context = ErrorContext::new("user_registration").with_username(username.clone());

    let id = engine
        .register(&username, password, &email)
        .await
        .map_err(|e| logged(&context, e))?;

    Ok(HttpResponse::Created().json(RegisterResponse { id }))
}

/// POST /api/v1/auth/login
///
/// Returns the token pair in the body and as http-only cookies.
///
/// # Errors
/// - 401: unknown user or wrong password (same response for both)
/// - 500: the refresh token could not be persisted
pub async fn login(
    form: web::Json<LoginRequest>,
    engine: web::Data<TokenEngine>,
) -> Result<HttpResponse, AppError> {
    // Stored usernames are trimmed at registration
    let username = form.username.trim();
    let context = ErrorContext::new("user_login").with_username(username.to_string());

    let tokens = engine
        .issue(username, &form.password)
        .await
        .map_err(|e| logged(&context, e))?;

    tracing::info!(request_id = %context.request_id, "User logged in successfully");
    Ok(token_response(&engine, tokens))
}

/// POST /api/v1/auth/refresh
///
/// Rotates the refresh token: the presented one is consumed.
///
/// # Errors
/// - 401: expired, malformed, unknown or already rotated refresh token
/// - 403: an access token was presented
/// - 500: the rotation could not be written; the old token stays valid
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    engine: web::Data<TokenEngine>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    let tokens = engine
        .refresh(&form.refresh_token)
        .await
        .map_err(|e| logged(&context, e))?;

    tracing::info!(request_id = %context.request_id, "Token refreshed successfully");
    Ok(token_response(&engine, tokens))
}

/// DELETE /api/v1/auth/revoke-token?refresh_token=...
///
/// # Errors
/// - 400: missing `refresh_token`
/// - 404: token is not live
/// - 500: cache failure
pub async fn revoke_token(
    query: web::Query<RevokeQuery>,
    engine: web::Data<TokenEngine>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_revoke");

    let token = query
        .refresh_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ValidationError::EmptyField("refresh_token".to_string()))?;

    engine.revoke(token).await.map_err(|e| logged(&context, e))?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Token revoked successfully".to_string(),
    }))
}

/// GET /api/v1/me
///
/// Claims are injected by the bearer middleware.
pub async fn get_current_user(claims: web::ReqData<Claims>) -> HttpResponse {
    let claims = claims.into_inner();
    HttpResponse::Ok().json(UserResponse {
        id: claims.sub,
        username: claims.username,
        role: claims.role,
    })
}

fn logged(context: &ErrorContext, err: crate::error::AuthError) -> AppError {
    let err = AppError::from(err);
    context.log_error(&err);
    err
}

fn token_response(engine: &TokenEngine, tokens: TokenPair) -> HttpResponse {
    let ttls = engine.ttls();
    HttpResponse::Ok()
        .cookie(token_cookie("access_token", &tokens.access_token, ttls.access))
        .cookie(token_cookie("refresh_token", &tokens.refresh_token, ttls.refresh))
        .json(tokens)
}

fn token_cookie<'c>(name: &'c str, value: &'c str, ttl: Duration) -> Cookie<'c> {
    let max_age = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    Cookie::build(name, value)
        .path("/")
        .secure(true)
        .http_only(true)
        .max_age(time::Duration::seconds(max_age))
        .finish()
}
