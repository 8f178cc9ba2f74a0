use actix_web::{http::header, web, HttpResponse};

use crate::app_state::AppState;
use crate::error::Result;

/// GET /media/{path}
pub async fn serve_media(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let (bytes, content_type) = state.media.open(&path.into_inner()).await?;
    Ok(HttpResponse::Ok()
        .content_type(content_type)
        .insert_header((header::CACHE_CONTROL, "public, max-age=3600"))
        .body(bytes))
}
