/// HTTP handlers for blog-service
pub mod auth;
pub mod comments;
pub mod follow;
pub mod health;
pub mod media;
pub mod posts;

use actix_web::{HttpRequest, HttpResponse, ResponseError};

use crate::error::AppError;

/// Fallback for unmatched routes
pub async fn not_found(req: HttpRequest) -> HttpResponse {
    AppError::NotFound(format!("no route for {}", req.path())).error_response()
}
