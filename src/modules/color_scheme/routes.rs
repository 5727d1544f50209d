use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::AppState;
use super::controller;

pub fn color_scheme_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/color-scheme", get(controller::current).put(controller::set))
        .route("/color-scheme/next", post(controller::cycle))
}
