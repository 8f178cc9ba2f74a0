/// Comment handlers
use actix_web::{web, HttpResponse};

use crate::app_state::AppState;
use crate::error::Result;
use crate::forms::CommentForm;
use crate::middleware::Viewer;
use crate::views::{post_detail_url, redirect};

/// POST /posts/{post_id}/comment/
///
/// Always lands back on the post page; an invalid comment is dropped.
pub async fn add_comment(
    state: web::Data<AppState>,
    viewer: Viewer,
    post_id: web::Path<i64>,
    form: Option<web::Form<CommentForm>>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    let comments = &state.services.comments;
    comments.ensure_post_exists(post_id).await?;

    let form = form.map(web::Form::into_inner).unwrap_or_default();
    match form.clean() {
        Ok(text) => {
            comments.create_comment(post_id, viewer.id, &text).await?;
        }
        Err(errors) => {
            tracing::debug!(post_id, ?errors, "comment rejected");
        }
    }

    Ok(redirect(&post_detail_url(post_id)))
}
