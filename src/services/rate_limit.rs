use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
};

use crate::services::form::{ActionError, FieldErrors};

/// Tracked clients before idle entries are dropped.
const MAX_TRACKED_CLIENTS: usize = 10_000;

pub type ClientRateLimiter = Arc<DefaultKeyedRateLimiter<IpAddr>>;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub per_minute: u32,
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_minute: 60,
            burst: 30,
        }
    }
}

/// One quota per client address: `burst` requests at once, refilled at `per_minute`.
pub fn create_rate_limiter(config: RateLimitConfig) -> ClientRateLimiter {
    let per_minute = NonZeroU32::new(config.per_minute).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(config.burst).unwrap_or(NonZeroU32::MIN);

    Arc::new(RateLimiter::keyed(
        Quota::per_minute(per_minute).allow_burst(burst),
    ))
}

/// Peer address recorded by `into_make_service_with_connect_info`. Requests
/// without one share a single bucket.
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

pub async fn rate_limit_by_client(
    State(limiter): State<ClientRateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_ip(&request);

    if limiter.check_key(&client).is_err() {
        tracing::warn!("Rate limit exceeded for {} on {}", client, request.uri().path());
        return ActionError::Form {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "Too many requests, try again in a minute".to_string(),
            field_errors: FieldErrors::new(),
        }
        .into_response();
    }

    if limiter.len() > MAX_TRACKED_CLIENTS {
        limiter.retain_recent();
    }

    next.run(request).await
}
