/// Bearer Authentication Middleware
///
/// Validates the access token from the Authorization header and injects
/// its claims into request extensions for use by route handlers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::TokenEngine;

/// Guard for routes that require an access token
pub struct JwtMiddleware {
    engine: web::Data<TokenEngine>,
}

impl JwtMiddleware {
    pub fn new(engine: web::Data<TokenEngine>) -> Self {
        Self { engine }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            engine: self.engine.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    engine: web::Data<TokenEngine>,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let bearer = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::to_string);

        let Some(token) = bearer else {
            tracing::warn!("Missing or invalid Authorization header");
            return Box::pin(async move {
                Err(reject("MISSING_TOKEN", "Missing or invalid authorization header"))
            });
        };

        match self.engine.authenticate(&token) {
            Ok(claims) => {
                tracing::debug!(
                    user_id = %claims.sub,
                    username = %claims.username,
                    "Access token validated"
                );
                req.extensions_mut().insert(claims);

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                tracing::warn!(error = %e, "Access token rejected");
                let code = e.error_code();
                Box::pin(async move { Err(reject(code, "Invalid or expired token")) })
            }
        }
    }
}

fn reject(code: &'static str, message: &'static str) -> Error {
    let response = HttpResponse::Unauthorized().json(serde_json::json!({
        "error": message,
        "code": code
    }));
    actix_web::error::InternalError::from_response(message, response).into()
}
