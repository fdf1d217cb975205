use crate::errors::AppError;
use crate::rate_limit::limiter::{QuotaStatus, RateLimitDecision, RateLimiter, RequestInfo};
use axum::{
    extract::{ConnectInfo, Request},
    http::{header, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

/// Rate limiting middleware.
///
/// Allowed requests proceed downstream and get the quota headers on the
/// way back out; denied requests short-circuit with the limiter's
/// configured status and a `{error, retryAfter}` body. Requests the
/// limiter's skip hook exempts pass through without headers.
pub async fn rate_limit_middleware(
    limiter: Arc<RateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let info = request_info(&request);

    match limiter.check(&info).await? {
        RateLimitDecision::Exempt => Ok(next.run(request).await),
        RateLimitDecision::Allowed(quota) => {
            let mut response = next.run(request).await;
            // When limiters nest, the innermost (most specific) one has
            // already stamped its quota; leave it in place.
            if !response.headers().contains_key("x-ratelimit-limit") {
                set_quota_headers(response.headers_mut(), &quota);
            }
            Ok(response)
        }
        RateLimitDecision::Denied {
            quota,
            retry_after_secs,
        } => {
            tracing::warn!(
                path = %info.path,
                limit = quota.limit,
                retry_after_secs,
                "Rate limit exceeded"
            );

            let body = Json(json!({
                "error": limiter.config().message,
                "retryAfter": retry_after_secs,
            }));

            let mut response = (limiter.config().status_code, body).into_response();
            set_quota_headers(response.headers_mut(), &quota);
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }

            Ok(response)
        }
    }
}

/// Snapshot the request attributes the limiter's hooks may inspect
fn request_info(request: &Request) -> RequestInfo {
    RequestInfo {
        method: request.method().clone(),
        path: request.uri().path().to_string(),
        headers: request.headers().clone(),
        remote_addr: request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|connect_info| connect_info.0),
    }
}

/// Add the standard quota headers to a response
fn set_quota_headers(headers: &mut HeaderMap, quota: &QuotaStatus) {
    // X-RateLimit-Limit: maximum requests allowed in the window
    if let Ok(value) = HeaderValue::from_str(&quota.limit.to_string()) {
        headers.insert(HeaderName::from_static("x-ratelimit-limit"), value);
    }

    // X-RateLimit-Remaining: requests remaining
    if let Ok(value) = HeaderValue::from_str(&quota.remaining.to_string()) {
        headers.insert(HeaderName::from_static("x-ratelimit-remaining"), value);
    }

    // X-RateLimit-Reset: Unix timestamp when the window resets
    if let Ok(value) = HeaderValue::from_str(&quota.reset_epoch_secs.to_string()) {
        headers.insert(HeaderName::from_static("x-ratelimit-reset"), value);
    }
}
