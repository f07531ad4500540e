mod common;

use axum::http::StatusCode;
use common::*;

fn post_body(title: &str, content: &str) -> Multipart {
    Multipart::new()
        .text("csrf_token", CSRF)
        .text("title", title)
        .text("content", content)
}

#[tokio::test]
async fn test_create_post_and_list_it() {
    let app = TestApp::new();
    let user = app.create_user("writer", false).await;
    let cookies = app.cookies_for(&user);

    let response = app.get("/create_post", Some(&cookies)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("New Post"));

    let response = app
        .post_multipart(
            "/create_post",
            Some(&cookies),
            post_body("Hello world", "First post").text("image_url", ""),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/blog"));
    assert_eq!(flash_texts(&response), ["Your post has been created!"]);

    let posts = app.store.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].author_id, user.user_id);
    assert_eq!(posts[0].image_file, None);

    let response = app.get("/blog", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Hello world"));
    assert!(body.contains("writer"));
}

#[tokio::test]
async fn test_uploaded_picture_is_resized_under_random_name() {
    let app = TestApp::new();
    let user = app.create_user("writer", false).await;
    let cookies = app.cookies_for(&user);

    let body = post_body("Pictures", "Look at this")
        .text("image_url", "https://example.com/ignored.png")
        .file("image_upload", "holiday.png", "image/png", &png(2400, 1200));
    let response = app
        .post_multipart("/create_post", Some(&cookies), body)
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let post = app.store.posts().remove(0);
    let stored = post.image_file.expect("stored image");
    let (stem, ext) = stored.split_once('.').unwrap();
    assert_eq!(stem.len(), 16);
    assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(ext, "png");

    let path = app.settings.upload_dir.join(&stored);
    assert_eq!(image::image_dimensions(&path).unwrap(), (1200, 600));

    let response = app.get(&format!("/uploads/{stored}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_non_image_upload_is_rejected() {
    let app = TestApp::new();
    let user = app.create_user("writer", false).await;
    let cookies = app.cookies_for(&user);

    let body = post_body("Bad file", "Body").file(
        "image_upload",
        "notes.txt",
        "text/plain",
        b"hello",
    );
    let response = app
        .post_multipart("/create_post", Some(&cookies), body)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        body_string(response)
            .await
            .contains("Images only! (jpg, jpeg, png, gif)")
    );
    assert!(app.store.posts().is_empty());
}

#[tokio::test]
async fn test_invalid_post_form_rerenders_with_errors() {
    let app = TestApp::new();
    let user = app.create_user("writer", false).await;
    let cookies = app.cookies_for(&user);

    let response = app
        .post_multipart(
            "/create_post",
            Some(&cookies),
            post_body("", "Body").text("image_url", "not a url"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Field must be between 1 and 100 characters long."));
    assert!(body.contains("Invalid URL."));
    assert!(app.store.posts().is_empty());
}

#[tokio::test]
async fn test_create_post_requires_csrf() {
    let app = TestApp::new();
    let user = app.create_user("writer", false).await;
    let cookies = app.cookies_for(&user);

    let body = Multipart::new()
        .text("title", "No token")
        .text("content", "Body");
    let response = app
        .post_multipart("/create_post", Some(&cookies), body)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.store.posts().is_empty());
}

#[tokio::test]
async fn test_anonymous_cannot_create_posts() {
    let app = TestApp::new();
    let response = app.get("/create_post", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response).as_deref(),
        Some("/login?next=/create_post")
    );
}

#[tokio::test]
async fn test_post_detail_and_missing_posts() {
    let app = TestApp::new();
    let user = app.create_user("writer", false).await;
    let cookies = app.cookies_for(&user);
    app.post_multipart(
        "/create_post",
        Some(&cookies),
        post_body("Readable", "Line one"),
    )
    .await;

    let response = app.get("/post/1", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Readable"));
    assert!(!body.contains("/post/1/update"));

    let response = app.get("/post/1", Some(&cookies)).await;
    assert!(body_string(response).await.contains("/post/1/update"));

    assert_eq!(app.get("/post/99", None).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get("/post/abc", None).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_only_author_or_admin_can_update() {
    let app = TestApp::new();
    let author = app.create_user("author", false).await;
    let other = app.create_user("other", false).await;
    let admin = app.create_user("admin", true).await;

    app.post_multipart(
        "/create_post",
        Some(&app.cookies_for(&author)),
        post_body("Original", "Body").text("image_url", "https://example.com/cat.png"),
    )
    .await;

    let response = app.get("/post/1/update", Some(&app.cookies_for(&other))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .post_multipart(
            "/post/1/update",
            Some(&app.cookies_for(&other)),
            post_body("Hijacked", "Body"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.store.posts()[0].title, "Original");

    // edit page pre-fills the web image
    let response = app.get("/post/1/update", Some(&app.cookies_for(&author))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Update Post"));
    assert!(body.contains("https://example.com/cat.png"));

    let response = app
        .post_multipart(
            "/post/1/update",
            Some(&app.cookies_for(&author)),
            post_body("Edited", "New body"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/post/1"));
    assert_eq!(flash_texts(&response), ["Your post has been updated!"]);
    let post = &app.store.posts()[0];
    assert_eq!(post.title, "Edited");
    assert_eq!(post.image_file.as_deref(), Some("https://example.com/cat.png"));

    let response = app
        .post_multipart(
            "/post/1/update",
            Some(&app.cookies_for(&admin)),
            post_body("Moderated", "Body"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.store.posts()[0].title, "Moderated");
}

#[tokio::test]
async fn test_update_missing_post_is_404() {
    let app = TestApp::new();
    let user = app.create_user("writer", false).await;
    let response = app
        .post_multipart(
            "/post/42/update",
            Some(&app.cookies_for(&user)),
            post_body("x", "y"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_post() {
    let app = TestApp::new();
    let author = app.create_user("author", false).await;
    let other = app.create_user("other", false).await;
    let cookies = app.cookies_for(&author);

    app.post_multipart("/create_post", Some(&cookies), post_body("Doomed", "Body"))
        .await;

    let response = app
        .post_form(
            "/post/1/delete",
            Some(&app.cookies_for(&other)),
            &[("csrf_token", CSRF)],
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.store.posts().len(), 1);

    let response = app
        .post_form("/post/1/delete", Some(&cookies), &[("csrf_token", CSRF)])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/blog"));
    assert_eq!(flash_texts(&response), ["Your post has been deleted."]);
    assert!(app.store.posts().is_empty());

    let response = app
        .post_form("/post/1/delete", Some(&cookies), &[("csrf_token", CSRF)])
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
