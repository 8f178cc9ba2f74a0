use actix_web::web;

use crate::app_state::AppState;
use crate::handlers::{self, auth, comments, follow, health, media, posts};
use crate::metrics::serve_metrics;
use crate::middleware::{LoginRequired, PageCacheMiddleware};

/// Register every route, the shared state and the 404 fallback.
///
/// The viewer middleware is applied by the caller at app level so that the
/// per-resource login gate and page cache can see who is asking.
pub fn configure_routes(cfg: &mut web::ServiceConfig, state: &AppState) {
    let login_url = state.login_url().to_string();

    cfg.app_data(web::Data::new(state.clone()))
        .service(
            web::resource("/")
                .name("index")
                .wrap(PageCacheMiddleware::new(
                    state.page_cache.clone(),
                    state.index_cache_ttl(),
                ))
                .route(web::get().to(posts::index)),
        )
        .service(
            web::resource("/group/{slug}/")
                .name("group_list")
                .route(web::get().to(posts::group_posts)),
        )
        .service(
            web::resource("/profile/{username}/")
                .name("profile")
                .route(web::get().to(posts::profile)),
        )
        .service(
            web::resource("/profile/{username}/follow/")
                .name("profile_follow")
                .wrap(LoginRequired::new(&login_url))
                .route(web::get().to(follow::profile_follow)),
        )
        .service(
            web::resource("/profile/{username}/unfollow/")
                .name("profile_unfollow")
                .wrap(LoginRequired::new(&login_url))
                .route(web::get().to(follow::profile_unfollow)),
        )
        .service(
            web::resource(r"/posts/{post_id:\d+}/")
                .name("post_detail")
                .route(web::get().to(posts::post_detail)),
        )
        .service(
            web::resource(r"/posts/{post_id:\d+}/comment/")
                .name("add_comment")
                .wrap(LoginRequired::new(&login_url))
                .route(web::post().to(comments::add_comment)),
        )
        .service(
            web::resource(r"/posts/{post_id:\d+}/edit/")
                .name("post_edit")
                .wrap(LoginRequired::new(&login_url))
                .route(web::get().to(posts::edit_post_form))
                .route(web::post().to(posts::edit_post)),
        )
        .service(
            web::resource("/create/")
                .name("post_create")
                .wrap(LoginRequired::new(&login_url))
                .route(web::get().to(posts::create_post_form))
                .route(web::post().to(posts::create_post)),
        )
        .service(
            web::resource("/follow/")
                .name("follow_index")
                .wrap(LoginRequired::new(&login_url))
                .route(web::get().to(follow::follow_index)),
        )
        .service(
            web::scope("/auth")
                .service(
                    web::resource("/login/")
                        .name("login")
                        .route(web::get().to(auth::login_form))
                        .route(web::post().to(auth::login)),
                )
                .service(
                    web::resource("/signup/")
                        .name("signup")
                        .route(web::get().to(auth::signup_form))
                        .route(web::post().to(auth::signup)),
                )
                .service(
                    web::resource("/logout/")
                        .name("logout")
                        .route(web::get().to(auth::logout)),
                ),
        )
        .service(web::resource("/media/{path:.+}").route(web::get().to(media::serve_media)))
        .route("/health", web::get().to(health::readiness_check))
        .route("/health/live", web::get().to(health::liveness_check))
        .route("/metrics", web::get().to(serve_metrics))
        .default_service(web::to(handlers::not_found));
}
