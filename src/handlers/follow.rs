/// Follow handlers - the follow feed and follow/unfollow actions
use actix_web::{web, HttpRequest, HttpResponse};

use super::posts::page_param;
use crate::app_state::AppState;
use crate::error::Result;
use crate::middleware::Viewer;
use crate::views::{profile_url, redirect, render, FollowContext, PostCard, Template};

/// GET /follow/
pub async fn follow_index(
    state: web::Data<AppState>,
    req: HttpRequest,
    viewer: Viewer,
) -> Result<HttpResponse> {
    let page = state
        .services
        .feed
        .following(viewer.id, page_param(&req).as_deref())
        .await?;

    render(
        Template::Follow,
        &FollowContext {
            viewer: Some(viewer),
            page_obj: PostCard::page(page, &state.media),
        },
    )
}

/// GET /profile/{username}/follow/
pub async fn profile_follow(
    state: web::Data<AppState>,
    viewer: Viewer,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let outcome = state.services.follows.follow(viewer.id, &username).await?;
    tracing::debug!(viewer_id = viewer.id, author = %username, ?outcome, "follow requested");
    Ok(redirect(&profile_url(&username)))
}

/// GET /profile/{username}/unfollow/
pub async fn profile_unfollow(
    state: web::Data<AppState>,
    viewer: Viewer,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    state.services.follows.unfollow(viewer.id, &username).await?;
    Ok(redirect(&profile_url(&username)))
}
