/// Post handlers - feeds, post pages and the create/edit form
use actix_web::{web, HttpRequest, HttpResponse};
use std::collections::HashMap;

use crate::app_state::AppState;
use crate::error::Result;
use crate::forms::{ImageChange, PostForm, PostFormInput};
use crate::middleware::Viewer;
use crate::models::{Group, GroupSummary, NewPost, Post, PostChanges};
use crate::services::EditAccess;
use crate::views::{
    post_detail_url, profile_url, redirect, render, CommentFormView, GroupContext, IndexContext,
    PostCard, PostDetailContext, PostFormContext, PostFormView, ProfileContext, Template,
};

/// Raw `page` query parameter; the last one wins when repeated.
pub(crate) fn page_param(req: &HttpRequest) -> Option<String> {
    web::Query::<HashMap<String, String>>::from_query(req.query_string())
        .ok()
        .and_then(|query| query.get("page").cloned())
}

/// GET /
pub async fn index(
    state: web::Data<AppState>,
    req: HttpRequest,
    viewer: Option<Viewer>,
) -> Result<HttpResponse> {
    let page = state
        .services
        .feed
        .index(page_param(&req).as_deref())
        .await?;

    render(
        Template::Index,
        &IndexContext {
            viewer,
            page_obj: PostCard::page(page, &state.media),
        },
    )
}

/// GET /group/{slug}/
pub async fn group_posts(
    state: web::Data<AppState>,
    req: HttpRequest,
    viewer: Option<Viewer>,
    slug: web::Path<String>,
) -> Result<HttpResponse> {
    let (group, page) = state
        .services
        .feed
        .group(&slug, page_param(&req).as_deref())
        .await?;

    render(
        Template::GroupList,
        &GroupContext {
            viewer,
            group,
            page_obj: PostCard::page(page, &state.media),
        },
    )
}

/// GET /profile/{username}/
pub async fn profile(
    state: web::Data<AppState>,
    req: HttpRequest,
    viewer: Option<Viewer>,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let feed = state
        .services
        .feed
        .profile(
            &username,
            viewer.as_ref().map(|v| v.id),
            page_param(&req).as_deref(),
        )
        .await?;

    render(
        Template::Profile,
        &ProfileContext {
            viewer,
            author: feed.author.summary(),
            page_obj: PostCard::page(feed.page, &state.media),
            post_count: feed.post_count,
            following: feed.following,
            followers_count: feed.counts.followers,
            following_count: feed.counts.following,
        },
    )
}

/// GET /posts/{post_id}/
pub async fn post_detail(
    state: web::Data<AppState>,
    viewer: Option<Viewer>,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let detail = state
        .services
        .posts
        .get_post_detail(post_id.into_inner())
        .await?;

    render(
        Template::PostDetail,
        &PostDetailContext {
            viewer,
            post: PostCard::new(detail.post, &state.media),
            author_post_count: detail.author_post_count,
            comments: detail.comments,
            form: CommentFormView::default(),
        },
    )
}

async fn group_choices(state: &AppState) -> Result<Vec<Group>> {
    state.repo.list_groups().await
}

fn form_page(
    viewer: Viewer,
    form: PostFormView,
    groups: &[Group],
    editing: Option<i64>,
) -> Result<HttpResponse> {
    render(
        Template::CreatePost,
        &PostFormContext {
            viewer: Some(viewer),
            form,
            groups: groups.iter().map(|g| g.summary()).collect::<Vec<GroupSummary>>(),
            is_edit: editing.is_some(),
            post_id: editing,
        },
    )
}

/// Resolve the attachment a cleaned form asks for.
async fn resolve_image(
    state: &AppState,
    form: &PostForm,
    current: Option<String>,
) -> Result<Option<String>> {
    match &form.image {
        ImageChange::Keep => Ok(current),
        ImageChange::Clear => Ok(None),
        ImageChange::Upload(file) => Ok(Some(state.media.save(&file.filename, &file.bytes).await?)),
    }
}

/// GET /create/
pub async fn create_post_form(state: web::Data<AppState>, viewer: Viewer) -> Result<HttpResponse> {
    let groups = group_choices(&state).await?;
    form_page(viewer, PostFormView::default(), &groups, None)
}

/// POST /create/
pub async fn create_post(
    state: web::Data<AppState>,
    req: HttpRequest,
    viewer: Viewer,
    payload: web::Payload,
) -> Result<HttpResponse> {
    let input =
        PostFormInput::from_payload(&req, payload, state.media.max_upload_bytes()).await?;
    let groups = group_choices(&state).await?;

    let form = match input.clean(&groups) {
        Ok(form) => form,
        Err(errors) => {
            return form_page(viewer, PostFormView::rejected(&input, None, errors), &groups, None)
        }
    };

    let image = resolve_image(&state, &form, None).await?;
    state
        .services
        .posts
        .create_post(NewPost {
            author_id: viewer.id,
            text: form.text,
            group_id: form.group_id,
            image,
        })
        .await?;

    Ok(redirect(&profile_url(&viewer.username)))
}

fn edit_form_view(post: &Post) -> PostFormView {
    PostFormView {
        text: post.text.clone(),
        group: post.group_id.map(|id| id.to_string()).unwrap_or_default(),
        image: post.image.clone(),
        ..Default::default()
    }
}

/// GET /posts/{post_id}/edit/
pub async fn edit_post_form(
    state: web::Data<AppState>,
    viewer: Viewer,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    let post = match state.services.posts.edit_access(post_id, viewer.id).await? {
        EditAccess::Allowed(post) => post,
        EditAccess::NotAuthor(_) => return Ok(redirect(&post_detail_url(post_id))),
    };

    let groups = group_choices(&state).await?;
    form_page(viewer, edit_form_view(&post), &groups, Some(post_id))
}

/// POST /posts/{post_id}/edit/
pub async fn edit_post(
    state: web::Data<AppState>,
    req: HttpRequest,
    viewer: Viewer,
    post_id: web::Path<i64>,
    payload: web::Payload,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    let post = match state.services.posts.edit_access(post_id, viewer.id).await? {
        EditAccess::Allowed(post) => post,
        EditAccess::NotAuthor(_) => {
            tracing::debug!(post_id, viewer_id = viewer.id, "edit refused for non-author");
            return Ok(redirect(&post_detail_url(post_id)));
        }
    };

    let input =
        PostFormInput::from_payload(&req, payload, state.media.max_upload_bytes()).await?;
    let groups = group_choices(&state).await?;

    let form = match input.clean(&groups) {
        Ok(form) => form,
        Err(errors) => {
            let view = PostFormView::rejected(&input, post.image.clone(), errors);
            return form_page(viewer, view, &groups, Some(post_id));
        }
    };

    let image = resolve_image(&state, &form, post.image.clone()).await?;
    state
        .services
        .posts
        .update_post(
            &post,
            PostChanges {
                text: form.text,
                group_id: form.group_id,
                image,
            },
        )
        .await?;

    Ok(redirect(&post_detail_url(post_id)))
}
