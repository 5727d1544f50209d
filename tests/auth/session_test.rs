use axum::http::{header, HeaderValue, StatusCode};

use crate::common::{location, set_cookies, test_email, TestContext};

#[tokio::test]
async fn home_requires_session() {
    let ctx = TestContext::new();

    let response = ctx.server.get("/home").await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(response.headers()).as_deref(), Some("/sign-in"));
}

#[tokio::test]
async fn home_ignores_forged_session() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .get("/home")
        .add_header(header::COOKIE, HeaderValue::from_static("sid=forged.session.cookie"))
        .await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(response.headers()).as_deref(), Some("/sign-in"));
}

#[tokio::test]
async fn home_returns_signed_in_user() {
    let ctx = TestContext::new();
    let email = test_email();
    let user = ctx.store.seed_user(&email);

    let response = ctx
        .server
        .get("/home")
        .add_header(header::COOKIE, ctx.session_cookie(&user.id))
        .await;

    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["id"], user.id);
    assert_eq!(body["email"], email);
    assert_eq!(body["session_duration"], "EPHEMERAL");
}

#[tokio::test]
async fn session_of_missing_user_is_cleared() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .get("/home")
        .add_header(header::COOKIE, ctx.session_cookie("deleted-user"))
        .await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(response.headers()).as_deref(), Some("/sign-in"));

    let cookies = set_cookies(response.headers());
    assert!(cookies.iter().any(|cookie| cookie.starts_with("sid=;") && cookie.contains("Max-Age=0")));
}

#[tokio::test]
async fn sign_out_clears_session() {
    let ctx = TestContext::new();
    let user = ctx.store.seed_user(&test_email());

    let response = ctx
        .server
        .post("/sign-out")
        .add_header(header::COOKIE, ctx.session_cookie(&user.id))
        .await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(response.headers()).as_deref(), Some("/"));

    let cookies = set_cookies(response.headers());
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with("sid=;"));
    assert!(cookies[0].contains("Max-Age=0"));
    assert!(cookies[0].contains("Path=/"));
}

#[tokio::test]
async fn cookie_responses_are_not_cached() {
    let ctx = TestContext::new();

    let response = ctx.server.post("/sign-out").await;

    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).and_then(|v| v.to_str().ok()),
        Some("no-store")
    );
    assert_eq!(
        response
            .headers()
            .get(header::X_CONTENT_TYPE_OPTIONS)
            .and_then(|v| v.to_str().ok()),
        Some("nosniff")
    );
}
