use crate::{
    api::{auth, health},
    auth::JwtManager,
    config::{Config, LimiterRule},
    errors::Result,
    rate_limit::{
        rate_limit_middleware, OnLimitReached, RateLimiter, RateLimiterConfig, RemoteAddrPolicy,
        RequestInfo,
    },
    store::UserStore,
};
use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserStore>,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Arc<Config>, jwt: Arc<JwtManager>) -> Self {
        Self {
            users: Arc::new(UserStore::new()),
            jwt,
            config,
        }
    }
}

fn limiter_config(rule: &LimiterRule) -> RateLimiterConfig {
    RateLimiterConfig {
        window: Duration::from_millis(rule.window_ms),
        max_requests: rule.max_requests,
        message: rule.message.clone(),
        ..Default::default()
    }
}

/// Build the application router.
///
/// Health probes sit outside the rate-limited subtree; everything under
/// /api goes through the general limiter, with stricter per-route
/// limiters on login and registration. The returned limiter handles
/// must be destroyed on shutdown.
pub fn create_router(state: AppState) -> Result<(Router, Vec<Arc<RateLimiter>>)> {
    let rules = &state.config.rate_limit;

    let api_limiter = Arc::new(RateLimiter::new(limiter_config(&rules.api))?);

    // Count denied login attempts; repeated denials from one address
    // are a brute-force signal worth surfacing.
    let login_denied: OnLimitReached = Arc::new(|info: &RequestInfo, key: &str| {
        tracing::warn!(key = %key, path = %info.path, "Login rate limit reached");
        Ok(())
    });
    let login_limiter = Arc::new(RateLimiter::with_hooks(
        limiter_config(&rules.login),
        Arc::new(RemoteAddrPolicy),
        Some(login_denied),
    )?);

    let registration_limiter = Arc::new(RateLimiter::new(limiter_config(&rules.registration))?);

    let limiters = vec![
        api_limiter.clone(),
        login_limiter.clone(),
        registration_limiter.clone(),
    ];

    let register_routes = with_limiter(
        Router::new().route("/register", post(auth::register)),
        registration_limiter,
    );

    let login_routes = with_limiter(
        Router::new().route("/login", post(auth::login)),
        login_limiter,
    );

    let profile_routes = Router::new()
        .route("/profile", get(auth::profile))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::authenticate,
        ));

    let auth_routes = register_routes.merge(login_routes).merge(profile_routes);

    let api_routes = with_limiter(Router::new().nest("/auth", auth_routes), api_limiter);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .nest("/api", api_routes)
        .fallback(not_found)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    Ok((router, limiters))
}

fn with_limiter(router: Router<AppState>, limiter: Arc<RateLimiter>) -> Router<AppState> {
    router.layer(axum::middleware::from_fn(
        move |request: Request, next: Next| {
            let limiter = limiter.clone();
            async move { rate_limit_middleware(limiter, request, next).await }
        },
    ))
}

/// Attach an X-Request-Id to every request and response, honoring a
/// caller-provided one.
async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    match HeaderValue::from_str(&id) {
        Ok(value) => {
            let name = HeaderName::from_static("x-request-id");
            request.headers_mut().insert(name.clone(), value.clone());
            let mut response = next.run(request).await;
            response.headers_mut().insert(name, value);
            response
        }
        Err(_) => next.run(request).await,
    }
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not found", "status": 404 })),
    )
        .into_response()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use axum::body::Body;

    pub(crate) struct TestApp {
        pub router: Router,
        pub limiters: Vec<Arc<RateLimiter>>,
    }

    pub(crate) fn test_state(config: Config) -> AppState {
        let jwt = JwtManager::from_secret(
            "test-secret-key-for-jwt-signing-minimum-length",
            &config.auth,
        )
        .unwrap();
        AppState::new(Arc::new(config), Arc::new(jwt))
    }

    /// Router with limits generous enough to stay out of the way
    pub(crate) fn test_app() -> TestApp {
        let mut config = Config::default();
        config.rate_limit.api.max_requests = 1000;
        config.rate_limit.login.max_requests = 100;
        config.rate_limit.registration.max_requests = 100;
        test_app_with(config)
    }

    pub(crate) fn test_app_with(config: Config) -> TestApp {
        let (router, limiters) = create_router(test_state(config)).unwrap();
        TestApp { router, limiters }
    }

    pub(crate) fn json_request(
        method: &str,
        uri: &str,
        body: serde_json::Value,
    ) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub(crate) async fn read_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
