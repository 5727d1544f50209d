use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::AppState;
use super::controller;

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sign-in", get(controller::sign_in_page).post(controller::sign_in))
        .route("/magic-link", get(controller::verify_magic_link))
        .route("/sign-out", post(controller::sign_out))
        .route("/home", get(controller::home))
}
