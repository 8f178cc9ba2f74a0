use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage, HttpResponse,
};
use futures::future::{ready, Ready};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use crate::db::BlogRepository;
use crate::error::AppError;
use crate::services::TokenService;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Authenticated user attached to the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Viewer {
    pub id: i64,
    pub username: String,
}

/// Bearer header first, then the session cookie.
fn request_token(req: &ServiceRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());

    bearer.or_else(|| req.cookie(ACCESS_TOKEN_COOKIE).map(|c| c.value().to_string()))
}

/// Identifies the viewer from a JWT; requests without a valid token pass through anonymously.
///
/// The token subject must still name an existing account, so a deleted
/// user's token stops working immediately.
pub struct ViewerMiddleware {
    tokens: Arc<TokenService>,
    repo: Arc<dyn BlogRepository>,
}

impl ViewerMiddleware {
    pub fn new(tokens: Arc<TokenService>, repo: Arc<dyn BlogRepository>) -> Self {
        Self { tokens, repo }
    }
}

async fn resolve_viewer(repo: &dyn BlogRepository, id: i64, username: &str) -> Option<Viewer> {
    match repo.find_user_by_username(username).await {
        Ok(Some(user)) if user.id == id => Some(Viewer {
            id: user.id,
            username: user.username,
        }),
        Ok(_) => {
            tracing::debug!(user_id = id, "token subject no longer exists");
            None
        }
        Err(e) => {
            tracing::warn!("viewer lookup failed: {}", e);
            None
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ViewerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = ViewerMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ViewerMiddlewareService {
            service: Rc::new(service),
            tokens: self.tokens.clone(),
            repo: self.repo.clone(),
        }))
    }
}

pub struct ViewerMiddlewareService<S> {
    service: Rc<S>,
    tokens: Arc<TokenService>,
    repo: Arc<dyn BlogRepository>,
}

impl<S, B> Service<ServiceRequest> for ViewerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let repo = self.repo.clone();

        let claimed = request_token(&req).and_then(|token| {
            match self.tokens.verify(&token).and_then(|claims| {
                let id = claims.user_id()?;
                Ok((id, claims.username))
            }) {
                Ok(claimed) => Some(claimed),
                Err(e) => {
                    tracing::debug!("ignoring invalid token: {}", e);
                    None
                }
            }
        });

        Box::pin(async move {
            if let Some((id, username)) = claimed {
                if let Some(viewer) = resolve_viewer(repo.as_ref(), id, &username).await {
                    req.extensions_mut().insert(viewer);
                }
            }
            service.call(req).await
        })
    }
}

impl actix_web::FromRequest for Viewer {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        match req.extensions().get::<Viewer>() {
            Some(viewer) => ready(Ok(viewer.clone())),
            None => ready(Err(
                AppError::Authentication("User not authenticated".to_string()).into(),
            )),
        }
    }
}

/// `<login_url>?next=<path>` with the path percent-encoded except for `/`.
pub fn login_redirect_url(login_url: &str, path_and_query: &str) -> String {
    let next = urlencoding::encode(path_and_query).replace("%2F", "/");
    format!("{}?next={}", login_url, next)
}

/// Redirects anonymous requests to the login page.
pub struct LoginRequired {
    login_url: Rc<str>,
}

impl LoginRequired {
    pub fn new(login_url: &str) -> Self {
        Self {
            login_url: Rc::from(login_url),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for LoginRequired
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = LoginRequiredService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoginRequiredService {
            service: Rc::new(service),
            login_url: self.login_url.clone(),
        }))
    }
}

pub struct LoginRequiredService<S> {
    service: Rc<S>,
    login_url: Rc<str>,
}

impl<S, B> Service<ServiceRequest> for LoginRequiredService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if req.extensions().get::<Viewer>().is_none() {
            let path = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| req.path().to_string());
            let location = login_redirect_url(&self.login_url, &path);

            let response = HttpResponse::Found()
                .insert_header((header::LOCATION, location))
                .finish()
                .map_into_right_body();
            return Box::pin(async move { Ok(req.into_response(response)) });
        }

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await.map(ServiceResponse::map_into_left_body) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_redirect_keeps_slashes() {
        assert_eq!(
            login_redirect_url("/auth/login/", "/create/"),
            "/auth/login/?next=/create/"
        );
        assert_eq!(
            login_redirect_url("/auth/login/", "/follow/?page=2"),
            "/auth/login/?next=/follow/%3Fpage%3D2"
        );
    }
}
