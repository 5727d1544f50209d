pub mod config;
pub mod modules;
pub mod services;

use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use config::Database;
use modules::auth::auth_routes;
use modules::color_scheme::color_scheme_routes;
use services::mail::Mailer;
use services::rate_limit::{create_rate_limiter, rate_limit_by_client, RateLimitConfig};
use services::security::security_headers;
use services::session::SessionService;
use services::time::Clock;

pub struct AppState {
    pub db: Database,
    pub sessions: SessionService,
    pub mailer: Arc<dyn Mailer>,
    pub clock: Arc<dyn Clock>,
}

pub fn create_app(state: AppState, rate_limit: RateLimitConfig) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(auth_routes())
        .merge(color_scheme_routes())
        .layer(middleware::from_fn(security_headers))
        .layer(RequestBodyLimitLayer::new(1024 * 16)) // forms are tiny
        .layer(middleware::from_fn_with_state(
            create_rate_limiter(rate_limit),
            rate_limit_by_client,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> &'static str {
    "Planotes"
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
