//! View models and rendering
//!
//! Every page is a JSON document naming the template it stands for plus the
//! context that template would receive.

use actix_web::{http::header, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::forms::{FormErrors, PostFormInput};
use crate::media::MediaStorage;
use crate::middleware::Viewer;
use crate::models::{CommentView, Group, GroupSummary, PostView, UserSummary};
use crate::services::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Index,
    GroupList,
    Profile,
    PostDetail,
    CreatePost,
    Follow,
    Login,
    Signup,
}

impl Template {
    pub fn name(&self) -> &'static str {
        match self {
            Template::Index => "posts/index.html",
            Template::GroupList => "posts/group_list.html",
            Template::Profile => "posts/profile.html",
            Template::PostDetail => "posts/post_detail.html",
            Template::CreatePost => "posts/create_post.html",
            Template::Follow => "posts/follow.html",
            Template::Login => "users/login.html",
            Template::Signup => "users/signup.html",
        }
    }
}

/// Render `context` for `template` as a `200 OK` page.
pub fn render<C: Serialize>(template: Template, context: &C) -> Result<HttpResponse> {
    let mut page = match serde_json::to_value(context)? {
        Value::Object(map) => map,
        other => {
            return Err(AppError::Internal(format!(
                "context for {} is not an object: {}",
                template.name(),
                other
            )))
        }
    };
    page.insert("template".to_string(), Value::from(template.name()));

    Ok(HttpResponse::Ok().json(Value::Object(page)))
}

/// `302 Found` to `location`.
pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

pub fn post_detail_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

/// A post as listed in feeds and on its own page.
#[derive(Debug, Clone, Serialize)]
pub struct PostCard {
    pub id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author: UserSummary,
    pub group: Option<GroupSummary>,
    pub image: Option<String>,
    pub image_url: Option<String>,
}

impl PostCard {
    pub fn new(post: PostView, media: &MediaStorage) -> Self {
        let image_url = post.image.as_deref().map(|path| media.url_for(path));
        Self {
            id: post.id,
            text: post.text,
            pub_date: post.pub_date,
            author: post.author,
            group: post.group,
            image: post.image,
            image_url,
        }
    }

    pub fn page(page: Page<PostView>, media: &MediaStorage) -> Page<PostCard> {
        page.map(|post| PostCard::new(post, media))
    }
}

#[derive(Debug, Serialize)]
pub struct IndexContext {
    pub viewer: Option<Viewer>,
    pub page_obj: Page<PostCard>,
}

#[derive(Debug, Serialize)]
pub struct GroupContext {
    pub viewer: Option<Viewer>,
    pub group: Group,
    pub page_obj: Page<PostCard>,
}

#[derive(Debug, Serialize)]
pub struct ProfileContext {
    pub viewer: Option<Viewer>,
    pub author: UserSummary,
    pub page_obj: Page<PostCard>,
    pub post_count: i64,
    pub following: bool,
    pub followers_count: i64,
    pub following_count: i64,
}

#[derive(Debug, Default, Serialize)]
pub struct CommentFormView {
    pub text: String,
    pub errors: FormErrors,
}

#[derive(Debug, Serialize)]
pub struct PostDetailContext {
    pub viewer: Option<Viewer>,
    pub post: PostCard,
    pub author_post_count: i64,
    pub comments: Vec<CommentView>,
    pub form: CommentFormView,
}

#[derive(Debug, Default, Serialize)]
pub struct PostFormView {
    pub text: String,
    pub group: String,
    /// Current attachment when editing
    pub image: Option<String>,
    pub errors: FormErrors,
}

impl PostFormView {
    /// Echo a rejected submission back with its errors.
    pub fn rejected(input: &PostFormInput, current_image: Option<String>, errors: FormErrors) -> Self {
        Self {
            text: input.text.clone().unwrap_or_default(),
            group: input.group.clone().unwrap_or_default(),
            image: current_image,
            errors,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostFormContext {
    pub viewer: Option<Viewer>,
    pub form: PostFormView,
    pub groups: Vec<GroupSummary>,
    pub is_edit: bool,
    pub post_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct FollowContext {
    pub viewer: Option<Viewer>,
    pub page_obj: Page<PostCard>,
}

#[derive(Debug, Default, Serialize)]
pub struct LoginFormView {
    pub username: String,
    pub next: Option<String>,
    pub errors: FormErrors,
}

#[derive(Debug, Serialize)]
pub struct LoginContext {
    pub viewer: Option<Viewer>,
    pub form: LoginFormView,
}

#[derive(Debug, Default, Serialize)]
pub struct SignupFormView {
    pub username: String,
    pub errors: FormErrors,
}

#[derive(Debug, Serialize)]
pub struct SignupContext {
    pub viewer: Option<Viewer>,
    pub form: SignupFormView,
}
