//! Comments and follows.
#[macro_use]
mod common;

use actix_web::{http::StatusCode, test};
use serde_json::Value;

use blog_service::db::BlogRepository;

use common::{location, TestContext};

#[actix_web::test]
async fn signed_in_user_comments_on_post() {
    let ctx = TestContext::new();
    let author = ctx.user("leo").await;
    let reader = ctx.user("mia").await;
    let post = ctx.post(&author, "Discuss", None).await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/comment/", post.id))
        .insert_header(ctx.bearer(&reader))
        .set_form([("text", "Great post")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    let comments = ctx.repo().list_comments(post.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, "Great post");
    assert_eq!(comments[0].author.id, reader.id);
}

#[actix_web::test]
async fn anonymous_comment_is_not_saved() {
    let ctx = TestContext::new();
    let author = ctx.user("leo").await;
    let post = ctx.post(&author, "Discuss", None).await;
    let app = init_app!(ctx);

    let uri = format!("/posts/{}/comment/", post.id);
    let req = test::TestRequest::post()
        .uri(&uri)
        .set_form([("text", "drive-by")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/auth/login/?next={}", uri));
    assert!(ctx.repo().list_comments(post.id).await.unwrap().is_empty());
}

#[actix_web::test]
async fn blank_comment_is_dropped() {
    let ctx = TestContext::new();
    let author = ctx.user("leo").await;
    let post = ctx.post(&author, "Discuss", None).await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/comment/", post.id))
        .insert_header(ctx.bearer(&author))
        .set_form([("text", "   ")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(ctx.repo().list_comments(post.id).await.unwrap().is_empty());
}

#[actix_web::test]
async fn comment_on_missing_post_is_404() {
    let ctx = TestContext::new();
    let reader = ctx.user("mia").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/posts/404/comment/")
        .insert_header(ctx.bearer(&reader))
        .set_form([("text", "hello?")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn follow_then_unfollow() {
    let ctx = TestContext::new();
    let author = ctx.user("leo").await;
    let reader = ctx.user("mia").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/profile/leo/follow/")
        .insert_header(ctx.bearer(&reader))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/leo/");
    assert!(ctx.repo().is_following(reader.id, author.id).await.unwrap());

    // Following twice keeps a single edge
    let req = test::TestRequest::get()
        .uri("/profile/leo/follow/")
        .insert_header(ctx.bearer(&reader))
        .to_request();
    test::call_service(&app, req).await;
    assert_eq!(ctx.repo().follow_counts(author.id).await.unwrap().followers, 1);

    let req = test::TestRequest::get()
        .uri("/profile/leo/")
        .insert_header(ctx.bearer(&reader))
        .to_request();
    let profile: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(profile["following"], true);
    assert_eq!(profile["followers_count"], 1);

    let req = test::TestRequest::get()
        .uri("/profile/leo/unfollow/")
        .insert_header(ctx.bearer(&reader))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/leo/");
    assert!(!ctx.repo().is_following(reader.id, author.id).await.unwrap());
}

#[actix_web::test]
async fn following_yourself_is_ignored() {
    let ctx = TestContext::new();
    let author = ctx.user("leo").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/profile/leo/follow/")
        .insert_header(ctx.bearer(&author))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(!ctx.repo().is_following(author.id, author.id).await.unwrap());
}

#[actix_web::test]
async fn unfollow_without_follow_is_404() {
    let ctx = TestContext::new();
    ctx.user("leo").await;
    let reader = ctx.user("mia").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/profile/leo/unfollow/")
        .insert_header(ctx.bearer(&reader))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn follow_unknown_author_is_404() {
    let ctx = TestContext::new();
    let reader = ctx.user("mia").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/profile/nobody/follow/")
        .insert_header(ctx.bearer(&reader))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn follow_feed_shows_only_followed_authors() {
    let ctx = TestContext::new();
    let author = ctx.user("leo").await;
    let other = ctx.user("max").await;
    let follower = ctx.user("mia").await;
    let outsider = ctx.user("ola").await;
    let followed_post = ctx.post(&author, "for my followers", None).await;
    ctx.post(&other, "unrelated", None).await;
    ctx.repo().create_follow(follower.id, author.id).await.unwrap();
    let app = init_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/follow/")
        .insert_header(ctx.bearer(&follower))
        .to_request();
    let feed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(feed["template"], "posts/follow.html");
    let list = feed["page_obj"]["object_list"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], followed_post.id);

    let req = test::TestRequest::get()
        .uri("/follow/")
        .insert_header(ctx.bearer(&outsider))
        .to_request();
    let feed: Value = test::call_and_read_body_json(&app, req).await;
    assert!(feed["page_obj"]["object_list"].as_array().unwrap().is_empty());
}
