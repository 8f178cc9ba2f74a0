use actix_web::{
    body::{self, BoxBody, MessageBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, Method, StatusCode},
    Error, HttpMessage, HttpResponse,
};
use futures::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use super::auth::Viewer;
use crate::cache::{CachedPage, PageCache};
use crate::metrics::record_cache_event;

pub const CACHE_STATUS_HEADER: &str = "x-page-cache";

/// Cache key: viewer, method and full path with query string.
pub fn page_cache_key(viewer_id: Option<i64>, method: &Method, path_and_query: &str) -> String {
    let viewer = viewer_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "anon".to_string());
    format!("page:v1:{}:{}:{}", viewer, method, path_and_query)
}

/// Full-page cache for GET responses; only `200 OK` pages are stored.
pub struct PageCacheMiddleware {
    cache: Arc<dyn PageCache>,
    ttl: Duration,
}

impl PageCacheMiddleware {
    pub fn new(cache: Arc<dyn PageCache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }
}

impl<S, B> Transform<S, ServiceRequest> for PageCacheMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = PageCacheMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(PageCacheMiddlewareService {
            service: Rc::new(service),
            cache: self.cache.clone(),
            ttl: self.ttl,
        }))
    }
}

pub struct PageCacheMiddlewareService<S> {
    service: Rc<S>,
    cache: Arc<dyn PageCache>,
    ttl: Duration,
}

fn cached_response(page: CachedPage) -> HttpResponse {
    let status = StatusCode::from_u16(page.status).unwrap_or(StatusCode::OK);
    let mut builder = HttpResponse::build(status);
    if let Some(content_type) = page.content_type {
        builder.insert_header((header::CONTENT_TYPE, content_type));
    }
    builder
        .insert_header((CACHE_STATUS_HEADER, "HIT"))
        .body(page.body)
}

impl<S, B> Service<ServiceRequest> for PageCacheMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        if req.method() != Method::GET {
            return Box::pin(async move {
                service
                    .call(req)
                    .await
                    .map(ServiceResponse::map_into_boxed_body)
            });
        }

        let cache = self.cache.clone();
        let ttl = self.ttl;
        let viewer_id = req.extensions().get::<Viewer>().map(|v| v.id);
        let path = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.path().to_string());
        let key = page_cache_key(viewer_id, req.method(), &path);

        Box::pin(async move {
            match cache.get(&key).await {
                Ok(Some(page)) => {
                    record_cache_event("hit");
                    tracing::debug!(%key, "page cache HIT");
                    return Ok(req.into_response(cached_response(page)));
                }
                Ok(None) => record_cache_event("miss"),
                Err(e) => {
                    record_cache_event("error");
                    tracing::warn!(%key, "page cache read failed: {}", e);
                }
            }

            let res = service.call(req).await?.map_into_boxed_body();
            if res.status() != StatusCode::OK {
                return Ok(res);
            }

            let (req, res) = res.into_parts();
            let content_type = res
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let (res, body) = res.into_parts();
            let bytes = body::to_bytes(body)
                .await
                .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?;

            let page = CachedPage {
                status: StatusCode::OK.as_u16(),
                content_type,
                body: bytes.to_vec(),
            };
            match cache.put(&key, &page, ttl).await {
                Ok(()) => record_cache_event("store"),
                Err(e) => {
                    record_cache_event("error");
                    tracing::warn!(%key, "page cache write failed: {}", e);
                }
            }

            Ok(ServiceResponse::new(req, res.set_body(BoxBody::new(bytes))))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_separates_viewers_and_queries() {
        let anon = page_cache_key(None, &Method::GET, "/");
        let user = page_cache_key(Some(4), &Method::GET, "/");
        let paged = page_cache_key(None, &Method::GET, "/?page=2");
        assert_eq!(anon, "page:v1:anon:GET:/");
        assert_ne!(anon, user);
        assert_ne!(anon, paged);
    }
}
