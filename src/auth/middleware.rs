use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use log::debug;
use sqlx::SqlitePool;
use std::rc::Rc;

use crate::auth::{login_url, verify_token, AuthSettings, CurrentUser, SESSION_COOKIE};
use crate::error::AppError;
use crate::flash::{self, FlashMessage};
use crate::models::User;

pub const LOGIN_REQUIRED: &str = "Please, log in to access this page";

/// Paths anonymous visitors may open.
const PUBLIC_PATHS: &[&str] = &["/", "/health", "/login/", "/logout/", "/users/", "/users/create/"];

pub fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

/// Resolves the session of every request into a `CurrentUser` extension and sends
/// anonymous visitors of protected pages to the login page.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let user = resolve_user(&req).await.map_err(Error::from)?;
            match user {
                Some(user) => {
                    req.extensions_mut().insert(user);
                }
                None if !is_public(req.path()) => {
                    let target = match req.query_string() {
                        "" => req.path().to_string(),
                        query => format!("{}?{}", req.path(), query),
                    };
                    debug!("anonymous request to {} sent to login", target);
                    let response =
                        flash::redirect(&login_url(&target), FlashMessage::error(LOGIN_REQUIRED));
                    return Ok(req.into_response(response).map_into_right_body());
                }
                None => {}
            }

            service
                .call(req)
                .await
                .map(ServiceResponse::map_into_left_body)
        })
    }
}

/// Session token from the cookie, or from an `Authorization: Bearer` header.
fn session_token(req: &ServiceRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// A bad or expired token, or one naming a deleted account, means anonymous.
async fn resolve_user(req: &ServiceRequest) -> Result<Option<CurrentUser>, AppError> {
    let token = match session_token(req) {
        Some(token) => token,
        None => return Ok(None),
    };

    let settings = req
        .app_data::<web::Data<AuthSettings>>()
        .ok_or_else(|| AppError::InternalServerError("Auth settings not configured".into()))?;
    let claims = match verify_token(settings.get_ref(), &token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("ignoring session token: {}", e);
            return Ok(None);
        }
    };

    let pool = req
        .app_data::<web::Data<SqlitePool>>()
        .ok_or_else(|| AppError::InternalServerError("Database pool not configured".into()))?;
    let user = User::find(pool.get_ref(), claims.sub).await?;
    Ok(user.map(CurrentUser::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_paths() {
        assert!(is_public("/"));
        assert!(is_public("/users/"));
        assert!(is_public("/users/create/"));
        assert!(!is_public("/users/1/update/"));
        assert!(!is_public("/tasks/"));
        assert!(!is_public("/statuses/"));
    }
}
