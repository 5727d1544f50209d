use axum::http::{header, StatusCode};
use axum_test::multipart::MultipartForm;
use serde_json::json;

use planotes::modules::auth::model::SessionDuration;
use planotes::services::session::{
    MAGIC_LINK_REQUIRED_GENERATION_DELAY_IN_MINUTES, MAGIC_LINK_VALIDITY_IN_MINUTES,
};

use crate::common::{location, set_cookies, test_email, TestContext};

const EMAIL_INVALID: &str = "Email address is invalid";
const EMAIL_REQUIRED: &str = "Email address is required";
const TOO_MANY_REQUESTS: &str = "Too many magic link requests for the same email address and device";
const MAIL_SENDING_FAILED: &str = "There was a problem with sending you an email, try again";

// =============================================================================
// SUCCESS
// =============================================================================

#[tokio::test]
async fn sign_in_with_valid_email_issues_magic_link() {
    let ctx = TestContext::new();
    let email = test_email();

    let response = ctx
        .server
        .post("/sign-in")
        .form(&[("email", email.as_str())])
        .await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(response.headers()).as_deref(), Some("/"));

    let links = ctx.store.magic_links_for(&email);
    assert_eq!(links.len(), 1);

    let link = &links[0];
    assert_eq!(
        link.valid_until,
        ctx.now.timestamp() + MAGIC_LINK_VALIDITY_IN_MINUTES * 60
    );
    assert_eq!(link.session_duration, SessionDuration::Ephemeral);
    assert_eq!(link.token.len(), 43);

    let cookies = set_cookies(response.headers());
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with("mid="));
    assert!(cookies[0].contains("HttpOnly"));

    let sent = ctx.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].email, email);
    assert_eq!(sent[0].token, link.token);
}

#[tokio::test]
async fn magic_identifier_cookie_references_new_link() {
    let ctx = TestContext::new();
    let email = test_email();

    let response = ctx
        .server
        .post("/sign-in")
        .form(&[("email", email.as_str())])
        .await;

    let cookies = set_cookies(response.headers());
    let mut headers = axum::http::HeaderMap::new();
    headers.insert(header::COOKIE, crate::common::cookie_header(&[&cookies[0]]));

    let link = &ctx.store.magic_links_for(&email)[0];
    assert_eq!(ctx.sessions.get_magic_identifier(&headers).as_deref(), Some(link.id.as_str()));
}

#[tokio::test]
async fn remember_me_requests_persistent_session() {
    let ctx = TestContext::new();
    let email = test_email();

    ctx.server
        .post("/sign-in")
        .form(&[("email", email.as_str()), ("rememberMe", "on")])
        .await
        .assert_status(StatusCode::SEE_OTHER);

    let links = ctx.store.magic_links_for(&email);
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].session_duration, SessionDuration::Persistent);
}

#[tokio::test]
async fn multipart_form_is_accepted() {
    let ctx = TestContext::new();
    let email = test_email();

    let form = MultipartForm::new()
        .add_text("email", email.clone())
        .add_text("rememberMe", "on");

    let response = ctx.server.post("/sign-in").multipart(form).await;

    response.assert_status(StatusCode::SEE_OTHER);
    let links = ctx.store.magic_links_for(&email);
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].session_duration, SessionDuration::Persistent);
}

#[tokio::test]
async fn existing_user_is_reused() {
    let ctx = TestContext::new();
    let email = test_email();
    let user = ctx.store.seed_user(&email);

    ctx.server
        .post("/sign-in")
        .form(&[("email", email.as_str())])
        .await
        .assert_status(StatusCode::SEE_OTHER);

    assert_eq!(ctx.store.users().len(), 1);
    assert_eq!(ctx.store.magic_links()[0].user_id, user.id);
}

#[tokio::test]
async fn email_case_does_not_create_second_user() {
    let ctx = TestContext::new();
    let email = test_email();
    let user = ctx.store.seed_user(&email);

    ctx.server
        .post("/sign-in")
        .form(&[("email", email.to_uppercase().as_str())])
        .await
        .assert_status(StatusCode::SEE_OTHER);

    assert_eq!(ctx.store.users().len(), 1);
    assert_eq!(ctx.store.magic_links()[0].user_id, user.id);
    assert_eq!(ctx.store.writes(), 1);
}

#[tokio::test]
async fn resubmitting_without_cookie_creates_independent_link() {
    let ctx = TestContext::new();
    let email = test_email();

    for _ in 0..2 {
        ctx.server
            .post("/sign-in")
            .form(&[("email", email.as_str())])
            .await
            .assert_status(StatusCode::SEE_OTHER);
    }

    let links = ctx.store.magic_links_for(&email);
    assert_eq!(links.len(), 2);
    assert_ne!(links[0].id, links[1].id);
    assert_ne!(links[0].token, links[1].token);
}

// =============================================================================
// VALIDATION
// =============================================================================

#[tokio::test]
async fn malformed_emails_are_rejected_without_writes() {
    let ctx = TestContext::new();

    for (email, message) in [
        ("not-an-email", EMAIL_INVALID),
        ("", EMAIL_REQUIRED),
        ("@example.com", EMAIL_INVALID),
        ("user@", EMAIL_INVALID),
    ] {
        let response = ctx.server.post("/sign-in").form(&[("email", email)]).await;

        response.assert_status(StatusCode::BAD_REQUEST);

        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "Incorrect request data");
        assert_eq!(body["field_errors"]["email"], message, "email {:?}", email);
    }

    assert_eq!(ctx.store.writes(), 0);
    assert!(ctx.store.users().is_empty());
    assert!(ctx.mailer.sent().is_empty());
}

#[tokio::test]
async fn missing_email_field_is_required() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .post("/sign-in")
        .form(&[("rememberMe", "on")])
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["field_errors"]["email"], EMAIL_REQUIRED);
    assert_eq!(ctx.store.writes(), 0);
}

#[tokio::test]
async fn repeated_email_field_is_invalid() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .post("/sign-in")
        .form(&[("email", "a@example.com"), ("email", "b@example.com")])
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["field_errors"]["email"], EMAIL_INVALID);
    assert_eq!(ctx.store.writes(), 0);
}

#[tokio::test]
async fn json_body_is_not_a_form() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .post("/sign-in")
        .json(&json!({ "email": test_email() }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(
        body["field_errors"]["other"],
        "Make sure you're properly submitting form and try again"
    );
    assert_eq!(ctx.store.writes(), 0);
}

// =============================================================================
// THROTTLING
// =============================================================================

#[tokio::test]
async fn recent_link_with_cookie_is_throttled() {
    let ctx = TestContext::new();
    let email = test_email();
    let user = ctx.store.seed_user(&email);

    // Issued one minute ago
    let previous = ctx.store.seed_magic_link(
        &user.id,
        ctx.now.timestamp() + (MAGIC_LINK_VALIDITY_IN_MINUTES - 1) * 60,
    );

    let response = ctx
        .server
        .post("/sign-in")
        .add_header(header::COOKIE, ctx.magic_identifier_cookie(&previous.id))
        .form(&[("email", email.as_str())])
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: serde_json::Value = response.json();
    assert_eq!(body["field_errors"]["other"], TOO_MANY_REQUESTS);

    assert_eq!(ctx.store.writes(), 0);
    assert_eq!(ctx.store.magic_links().len(), 1);
    assert!(ctx.mailer.sent().is_empty());
    assert!(set_cookies(response.headers()).is_empty());
}

#[tokio::test]
async fn throttle_window_edge_is_inclusive() {
    let ctx = TestContext::new();
    let email = test_email();
    let user = ctx.store.seed_user(&email);

    let window = MAGIC_LINK_VALIDITY_IN_MINUTES - MAGIC_LINK_REQUIRED_GENERATION_DELAY_IN_MINUTES;
    let previous = ctx
        .store
        .seed_magic_link(&user.id, ctx.now.timestamp() + window * 60);

    ctx.server
        .post("/sign-in")
        .add_header(header::COOKIE, ctx.magic_identifier_cookie(&previous.id))
        .form(&[("email", email.as_str())])
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn recent_link_without_cookie_is_allowed() {
    let ctx = TestContext::new();
    let email = test_email();
    let user = ctx.store.seed_user(&email);
    ctx.store.seed_magic_link(
        &user.id,
        ctx.now.timestamp() + (MAGIC_LINK_VALIDITY_IN_MINUTES - 1) * 60,
    );

    ctx.server
        .post("/sign-in")
        .form(&[("email", email.as_str())])
        .await
        .assert_status(StatusCode::SEE_OTHER);

    assert_eq!(ctx.store.magic_links_for(&email).len(), 2);
}

#[tokio::test]
async fn older_link_with_cookie_is_allowed() {
    let ctx = TestContext::new();
    let email = test_email();
    let user = ctx.store.seed_user(&email);

    // Issued longer ago than the required regeneration delay
    let previous = ctx.store.seed_magic_link(
        &user.id,
        ctx.now.timestamp()
            + (MAGIC_LINK_VALIDITY_IN_MINUTES - MAGIC_LINK_REQUIRED_GENERATION_DELAY_IN_MINUTES) * 60
            - 1,
    );

    ctx.server
        .post("/sign-in")
        .add_header(header::COOKIE, ctx.magic_identifier_cookie(&previous.id))
        .form(&[("email", email.as_str())])
        .await
        .assert_status(StatusCode::SEE_OTHER);

    assert_eq!(ctx.store.magic_links_for(&email).len(), 2);
}

#[tokio::test]
async fn recent_link_of_other_user_does_not_throttle() {
    let ctx = TestContext::new();
    let other = ctx.store.seed_user(&test_email());
    let previous = ctx.store.seed_magic_link(
        &other.id,
        ctx.now.timestamp() + MAGIC_LINK_VALIDITY_IN_MINUTES * 60,
    );

    ctx.server
        .post("/sign-in")
        .add_header(header::COOKIE, ctx.magic_identifier_cookie(&previous.id))
        .form(&[("email", test_email().as_str())])
        .await
        .assert_status(StatusCode::SEE_OTHER);
}

// =============================================================================
// MAIL DELIVERY
// =============================================================================

#[tokio::test]
async fn mail_failure_deletes_link_and_returns_server_error() {
    let ctx = TestContext::new();
    ctx.mailer.fail_deliveries();
    let email = test_email();

    let response = ctx
        .server
        .post("/sign-in")
        .form(&[("email", email.as_str())])
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], MAIL_SENDING_FAILED);
    assert_eq!(body["field_errors"]["other"], MAIL_SENDING_FAILED);

    assert!(ctx.store.magic_links_for(&email).is_empty());
    assert!(ctx.store.magic_links().is_empty());
    // user insert, link insert, compensating delete
    assert_eq!(ctx.store.writes(), 3);
    assert!(set_cookies(response.headers()).is_empty());
}

// =============================================================================
// ALREADY SIGNED IN
// =============================================================================

#[tokio::test]
async fn signed_in_user_is_redirected_home() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .post("/sign-in")
        .add_header(header::COOKIE, ctx.session_cookie("user-1"))
        .form(&[("email", "not-an-email")])
        .await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(response.headers()).as_deref(), Some("/home"));
    assert_eq!(ctx.store.writes(), 0);
    assert!(ctx.mailer.sent().is_empty());
}

#[tokio::test]
async fn sign_in_page_renders_form() {
    let ctx = TestContext::new();

    let response = ctx.server.get("/sign-in").await;

    response.assert_status(StatusCode::OK);
    let html = response.text();
    assert!(html.contains(r#"name="email""#));
    assert!(html.contains(r#"name="rememberMe""#));
}

#[tokio::test]
async fn sign_in_page_redirects_signed_in_user() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .get("/sign-in")
        .add_header(header::COOKIE, ctx.session_cookie("user-1"))
        .await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(response.headers()).as_deref(), Some("/home"));
}
