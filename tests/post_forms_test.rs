//! Creating and editing posts through the form endpoints.
#[macro_use]
mod common;

use actix_web::{
    http::{header, StatusCode},
    test,
};
use serde_json::Value;

use blog_service::db::BlogRepository;
use blog_service::models::PostFilter;

use common::{location, multipart_body, multipart_content_type, TestContext, SMALL_GIF};

#[actix_web::test]
async fn valid_form_creates_post_and_redirects_to_profile() {
    let ctx = TestContext::new();
    let author = ctx.user("leo").await;
    let cats = ctx.group("cats").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/create/")
        .insert_header(ctx.bearer(&author))
        .set_form([("text", "A brand new post"), ("group", cats.id.to_string().as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/leo/");

    let posts = ctx.repo().list_posts(PostFilter::All, 10, 0).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].text, "A brand new post");
    assert_eq!(posts[0].author.id, author.id);
    assert_eq!(posts[0].group.as_ref().map(|g| g.id), Some(cats.id));
}

#[actix_web::test]
async fn multipart_form_stores_image() {
    let ctx = TestContext::new();
    let author = ctx.user("leo").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/create/")
        .insert_header(ctx.bearer(&author))
        .insert_header((header::CONTENT_TYPE, multipart_content_type()))
        .set_payload(multipart_body(
            &[("text", "With a picture"), ("group", "")],
            Some(("small.gif", SMALL_GIF)),
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let posts = ctx.repo().list_posts(PostFilter::All, 10, 0).await.unwrap();
    assert_eq!(posts.len(), 1);
    let image = posts[0].image.clone().expect("image stored");
    assert!(image.starts_with("posts/small"), "{}", image);

    let detail = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/posts/{}/", posts[0].id))
            .to_request(),
    )
    .await;
    let detail: Value = test::read_body_json(detail).await;
    assert_eq!(detail["post"]["image_url"], format!("/media/{}", image));

    let media = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/media/{}", image))
            .to_request(),
    )
    .await;
    assert_eq!(media.status(), StatusCode::OK);
    assert_eq!(media.headers().get(header::CONTENT_TYPE).unwrap(), "image/gif");
    assert_eq!(&test::read_body(media).await[..], SMALL_GIF);
}

#[actix_web::test]
async fn invalid_form_is_rerendered_with_errors() {
    let ctx = TestContext::new();
    let author = ctx.user("leo").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/create/")
        .insert_header(ctx.bearer(&author))
        .set_form([("text", "   "), ("group", "999")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["template"], "posts/create_post.html");
    assert!(body["form"]["errors"]["text"].is_array());
    assert!(body["form"]["errors"]["group"].is_array());
    assert_eq!(ctx.repo().count_posts(PostFilter::All).await.unwrap(), 0);
}

#[actix_web::test]
async fn non_image_upload_is_rejected() {
    let ctx = TestContext::new();
    let author = ctx.user("leo").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/create/")
        .insert_header(ctx.bearer(&author))
        .insert_header((header::CONTENT_TYPE, multipart_content_type()))
        .set_payload(multipart_body(
            &[("text", "Not a picture")],
            Some(("notes.gif", b"just some text".as_slice())),
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["form"]["errors"]["image"].is_array());
    assert_eq!(ctx.repo().count_posts(PostFilter::All).await.unwrap(), 0);
}

#[actix_web::test]
async fn corrupted_gif_upload_is_rejected() {
    let ctx = TestContext::new();
    let author = ctx.user("leo").await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/create/")
        .insert_header(ctx.bearer(&author))
        .insert_header((header::CONTENT_TYPE, multipart_content_type()))
        .set_payload(multipart_body(
            &[("text", "Broken picture")],
            Some((
                "broken.gif",
                b"GIF89a this is not really an image at all".as_slice(),
            )),
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["form"]["errors"]["image"].is_array());
    assert_eq!(ctx.repo().count_posts(PostFilter::All).await.unwrap(), 0);
}

#[actix_web::test]
async fn anonymous_create_persists_nothing() {
    let ctx = TestContext::new();
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/create/")
        .set_form([("text", "sneaky")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/?next=/create/");
    assert_eq!(ctx.repo().count_posts(PostFilter::All).await.unwrap(), 0);
}

#[actix_web::test]
async fn author_edit_updates_post_in_place() {
    let ctx = TestContext::new();
    let author = ctx.user("leo").await;
    let cats = ctx.group("cats").await;
    let dogs = ctx.group("dogs").await;
    let post = ctx.post(&author, "Original text", Some(&cats)).await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(ctx.bearer(&author))
        .set_form([("text", "Edited text"), ("group", dogs.id.to_string().as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    assert_eq!(ctx.repo().count_posts(PostFilter::All).await.unwrap(), 1);
    let edited = ctx.repo().find_post(post.id).await.unwrap().unwrap();
    assert_eq!(edited.text, "Edited text");
    assert_eq!(edited.group_id, Some(dogs.id));
    assert_eq!(edited.author_id, author.id);
    assert_eq!(edited.pub_date, post.pub_date);
}

#[actix_web::test]
async fn edit_form_is_prefilled() {
    let ctx = TestContext::new();
    let author = ctx.user("leo").await;
    let cats = ctx.group("cats").await;
    let post = ctx.post(&author, "Original text", Some(&cats)).await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(ctx.bearer(&author))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["is_edit"], true);
    assert_eq!(body["post_id"], post.id);
    assert_eq!(body["form"]["text"], "Original text");
    assert_eq!(body["form"]["group"], cats.id.to_string());
    assert_eq!(body["groups"][0]["slug"], "cats");
}

#[actix_web::test]
async fn non_author_edit_changes_nothing() {
    let ctx = TestContext::new();
    let author = ctx.user("leo").await;
    let stranger = ctx.user("mia").await;
    let post = ctx.post(&author, "Original text", None).await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(ctx.bearer(&stranger))
        .set_form([("text", "Vandalised")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));
    let unchanged = ctx.repo().find_post(post.id).await.unwrap().unwrap();
    assert_eq!(unchanged.text, "Original text");
}
