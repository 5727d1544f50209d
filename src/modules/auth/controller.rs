use axum::{
    extract::{FromRequest, Query, Request, State},
    http::{header, HeaderMap},
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::modules::auth::{
    interface::AuthError,
    model::{MagicLink, MagicLinkFilter},
    schema::{MagicLinkQuery, SignInForm, UserResponse, REDIRECTS},
};
use crate::services::form::{convert_form_data_into_object, FormPairs};
use crate::services::session::{
    generate_magic_token, MAGIC_LINK_REQUIRED_GENERATION_DELAY_IN_MINUTES,
    MAGIC_LINK_VALIDITY_IN_MINUTES,
};
use crate::services::time::date_with_offset;
use crate::AppState;

const SIGN_IN_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Planotes</title></head>
<body>
<form method="post" action="/sign-in">
<label>Email address <input name="email" type="email" autocomplete="email"></label>
<label><input name="rememberMe" type="checkbox"> Remember me</label>
<p>You don't need to create an account, just use your email address! We'll send you a link that lets you login with this device. No need to remember a password!</p>
<button>Sign in</button>
</form>
</body>
</html>"#;

pub async fn sign_in_page(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if state.sessions.is_signed_in(&headers) {
        return Redirect::to(REDIRECTS.home).into_response();
    }

    Html(SIGN_IN_PAGE).into_response()
}

/// Request a magic link for the submitted email address.
pub async fn sign_in(State(state): State<Arc<AppState>>, request: Request) -> Result<Response, AuthError> {
    if state.sessions.is_signed_in(request.headers()) {
        return Ok(Redirect::to(REDIRECTS.home).into_response());
    }

    let headers = request.headers().clone();
    let FormPairs(pairs) = FormPairs::from_request(request, &state)
        .await
        .map_err(|_| AuthError::FormDataInvalid)?;

    let sign_in = SignInForm::from_form(&convert_form_data_into_object(pairs))
        .and_then(SignInForm::into_request)
        .map_err(AuthError::Validation)?;

    let user = state.db.user().upsert(&sign_in.email).await?;
    let now = state.clock.now();

    let throttle_from = date_with_offset(
        now,
        MAGIC_LINK_VALIDITY_IN_MINUTES - MAGIC_LINK_REQUIRED_GENERATION_DELAY_IN_MINUTES,
    );
    let previous_magic_link = state
        .db
        .magic_link()
        .find_first(&MagicLinkFilter::for_user(&user.id).valid_until_gte(throttle_from.timestamp()))
        .await?;

    let magic_identifier = state.sessions.get_magic_identifier(&headers);

    if previous_magic_link.is_some() && magic_identifier.is_some() {
        tracing::info!("Throttled magic link request for user {}", user.id);
        return Err(AuthError::TooManyRequests);
    }

    let magic_link = MagicLink {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        token: generate_magic_token().map_err(AuthError::Internal)?,
        session_duration: sign_in.session_duration,
        valid_until: date_with_offset(now, MAGIC_LINK_VALIDITY_IN_MINUTES).timestamp(),
        created_at: now,
    };

    state.db.magic_link().create(&magic_link).await?;

    if let Err(e) = state.mailer.send_magic_link(&magic_link.token, &sign_in.email).await {
        tracing::warn!("Failed to send magic link {}: {}", magic_link.id, e);
        state.db.magic_link().delete(&magic_link.id).await?;
        return Err(AuthError::MailSendingFailed);
    }

    let cookie = state.sessions.create_magic_identifier_cookie(&magic_link.id, now)?;
    tracing::info!("Issued magic link {} for user {}", magic_link.id, user.id);

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::to(REDIRECTS.main),
    )
        .into_response())
}

/// Exchange a magic link for a session on the device that requested it.
pub async fn verify_magic_link(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<MagicLinkQuery>,
) -> Result<Response, AuthError> {
    if state.sessions.is_signed_in(&headers) {
        return Ok(Redirect::to(REDIRECTS.home).into_response());
    }

    if query.token.is_empty() {
        return Err(AuthError::InvalidMagicLink);
    }

    let now = state.clock.now();
    let magic_link = state
        .db
        .magic_link()
        .find_first(&MagicLinkFilter::for_token(&query.token).valid_until_gte(now.timestamp()))
        .await?
        .ok_or(AuthError::InvalidMagicLink)?;

    match state.sessions.get_magic_identifier(&headers) {
        Some(magic_identifier) if magic_identifier == magic_link.id => {}
        _ => {
            tracing::info!("Magic link {} opened without its device cookie", magic_link.id);
            return Err(AuthError::InvalidMagicLink);
        }
    }

    state.db.magic_link().delete(&magic_link.id).await?;

    let session_cookie = state
        .sessions
        .create_session_cookie(&magic_link.user_id, magic_link.session_duration, now)?;
    tracing::info!(
        "User {} signed in with a {} session",
        magic_link.user_id,
        magic_link.session_duration
    );

    Ok((
        AppendHeaders([
            (header::SET_COOKIE, session_cookie),
            (header::SET_COOKIE, state.sessions.clear_magic_identifier_cookie()),
        ]),
        Redirect::to(REDIRECTS.home),
    )
        .into_response())
}

pub async fn sign_out(State(state): State<Arc<AppState>>) -> Response {
    (
        AppendHeaders([(header::SET_COOKIE, state.sessions.clear_session_cookie())]),
        Redirect::to(REDIRECTS.main),
    )
        .into_response()
}

pub async fn home(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Response, AuthError> {
    let Some(session) = state.sessions.current_session(&headers) else {
        return Ok(Redirect::to(REDIRECTS.sign_in).into_response());
    };

    let Some(user) = state.db.user().find_by_id(&session.sub).await? else {
        // Session outlived its user
        return Ok((
            AppendHeaders([(header::SET_COOKIE, state.sessions.clear_session_cookie())]),
            Redirect::to(REDIRECTS.sign_in),
        )
            .into_response());
    };

    Ok(Json(UserResponse {
        id: user.id,
        email: user.email,
        session_duration: session.sd,
        created_at: user.created_at,
    })
    .into_response())
}
