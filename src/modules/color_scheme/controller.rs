use axum::{
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse, Response},
    Json,
};

use crate::modules::color_scheme::schema::{ColorSchemeResponse, SetColorSchemeRequest};
use crate::services::color_scheme::{
    create_color_scheme_cookie, get_color_scheme, get_next_color_scheme, ColorScheme,
};

pub async fn current(headers: HeaderMap) -> Json<ColorSchemeResponse> {
    Json(ColorSchemeResponse {
        color_scheme: get_color_scheme(&headers),
    })
}

pub async fn set(Json(req): Json<SetColorSchemeRequest>) -> Response {
    store(req.color_scheme)
}

/// Move to the next scheme in the DARK -> LIGHT -> SYSTEM cycle.
pub async fn cycle(headers: HeaderMap) -> Response {
    store(get_next_color_scheme(get_color_scheme(&headers)))
}

fn store(color_scheme: ColorScheme) -> Response {
    tracing::debug!("Color scheme set to {}", color_scheme);

    (
        AppendHeaders([(header::SET_COOKIE, create_color_scheme_cookie(color_scheme))]),
        Json(ColorSchemeResponse { color_scheme }),
    )
        .into_response()
}
