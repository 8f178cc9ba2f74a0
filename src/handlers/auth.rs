/// Account handlers - login, sign-up and logout
use actix_web::{
    cookie::{time::Duration as CookieDuration, Cookie, SameSite},
    http::header,
    web, HttpResponse,
};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::forms::{FormErrors, LoginForm, SignupForm};
use crate::middleware::{Viewer, ACCESS_TOKEN_COOKIE};
use crate::models::User;
use crate::views::{
    redirect, render, LoginContext, LoginFormView, SignupContext, SignupFormView, Template,
};

const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";
const USERNAME_TAKEN: &str = "A user with that username already exists.";

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
    expires_in: i64,
}

/// Only same-site absolute paths are followed after login.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

/// Issue a token for `user`, store it in the session cookie and redirect.
fn start_session(state: &AppState, user: &User, next: Option<&str>) -> Result<HttpResponse> {
    let token = state.tokens.issue(user)?;
    let cookie = Cookie::build(ACCESS_TOKEN_COOKIE, token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.is_production())
        .max_age(CookieDuration::seconds(state.tokens.ttl_secs()))
        .finish();

    tracing::info!(user_id = user.id, "session started");
    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, safe_next(next)))
        .cookie(cookie)
        .json(TokenResponse {
            access_token: token,
            token_type: "Bearer",
            expires_in: state.tokens.ttl_secs(),
        }))
}

/// GET /auth/login/
pub async fn login_form(
    viewer: Option<Viewer>,
    query: web::Query<NextQuery>,
) -> Result<HttpResponse> {
    render(
        Template::Login,
        &LoginContext {
            viewer,
            form: LoginFormView {
                next: query.into_inner().next,
                ..Default::default()
            },
        },
    )
}

/// POST /auth/login/
pub async fn login(
    state: web::Data<AppState>,
    query: web::Query<NextQuery>,
    form: Option<web::Form<LoginForm>>,
) -> Result<HttpResponse> {
    let form = form.map(web::Form::into_inner).unwrap_or_default();
    let next = form.next.clone().or_else(|| query.into_inner().next);

    let rejected = |errors: FormErrors| {
        render(
            Template::Login,
            &LoginContext {
                viewer: None,
                form: LoginFormView {
                    username: form.username.clone(),
                    next: next.clone(),
                    errors,
                },
            },
        )
    };

    if let Err(errors) = form.clean() {
        return rejected(errors);
    }

    match state
        .services
        .auth
        .authenticate(&form.username, &form.password)
        .await
    {
        Ok(user) => start_session(&state, &user, next.as_deref()),
        Err(AppError::Authentication(_)) => {
            tracing::debug!(username = %form.username, "login rejected");
            let mut errors = FormErrors::new();
            errors.add(FormErrors::NON_FIELD, INVALID_LOGIN);
            rejected(errors)
        }
        Err(e) => Err(e),
    }
}

/// GET /auth/signup/
pub async fn signup_form(viewer: Option<Viewer>) -> Result<HttpResponse> {
    render(
        Template::Signup,
        &SignupContext {
            viewer,
            form: SignupFormView::default(),
        },
    )
}

/// POST /auth/signup/
pub async fn signup(
    state: web::Data<AppState>,
    form: Option<web::Form<SignupForm>>,
) -> Result<HttpResponse> {
    let form = form.map(web::Form::into_inner).unwrap_or_default();

    let rejected = |errors: FormErrors| {
        render(
            Template::Signup,
            &SignupContext {
                viewer: None,
                form: SignupFormView {
                    username: form.username.clone(),
                    errors,
                },
            },
        )
    };

    if let Err(errors) = form.clean() {
        return rejected(errors);
    }

    match state
        .services
        .auth
        .register(&form.username, &form.password1)
        .await
    {
        Ok(user) => start_session(&state, &user, None),
        Err(AppError::Conflict(_)) => {
            let mut errors = FormErrors::new();
            errors.add("username", USERNAME_TAKEN);
            rejected(errors)
        }
        Err(e) => Err(e),
    }
}

/// GET /auth/logout/
pub async fn logout() -> HttpResponse {
    let mut cookie = Cookie::build(ACCESS_TOKEN_COOKIE, "").path("/").finish();
    cookie.make_removal();

    let mut response = redirect("/");
    if let Err(e) = response.add_cookie(&cookie) {
        tracing::warn!("failed to clear session cookie: {}", e);
    }
    response
}
