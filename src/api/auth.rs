// Registration, login and profile endpoints

use crate::api::routes::AppState;
use crate::auth::{jwt::Claims, password};
use crate::errors::{AppError, Result};
use crate::store::User;
use crate::validation;
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: UserSummary,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let email = validation::validate_email(&req.email)?;
    validation::validate_password(&req.password, &state.config.auth)?;
    let name = validation::resolve_name(req.name.as_deref(), &email)?;

    let password_hash = password::hash_password(&req.password, &state.config.auth)?;
    let user = User::new(email, name, password_hash);

    state.users.insert(user.clone())?;

    let token = state.jwt.generate_token(user.id, &user.email)?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Registration successful".to_string(),
            user: UserSummary::from(&user),
            token,
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    if req.email.trim().is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }
    if req.password.is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }

    let email = req.email.trim().to_lowercase();

    // Unknown user and bad password produce the same response
    let user = state
        .users
        .find_by_email(&email)
        .ok_or(AppError::InvalidCredentials)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::warn!(user_id = %user.id, "Failed login attempt");
        return Err(AppError::InvalidCredentials);
    }

    let token = state.jwt.generate_token(user.id, &user.email)?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        user: UserSummary::from(&user),
        token,
    }))
}

/// GET /api/auth/profile
///
/// Requires a valid bearer token; claims are injected by the
/// authentication middleware.
pub async fn profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ProfileResponse>> {
    let user_id = claims.user_id()?;

    let user = state
        .users
        .find_by_id(user_id)
        .ok_or(AppError::UserNotFound)?;

    Ok(Json(ProfileResponse {
        id: user.id,
        email: user.email,
        name: user.name,
        created_at: user.created_at,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::routes::testing::{json_request, read_json, test_app};
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_register_creates_user_and_token() {
        let app = test_app();

        let response = app
            .router
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                json!({"email": "  New.User@Example.com ", "password": "Sup3r-secret", "name": "New User"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = read_json(response).await;
        assert_eq!(body["message"], "Registration successful");
        assert_eq!(body["user"]["email"], "new.user@example.com");
        assert_eq!(body["user"]["name"], "New User");
        assert!(!body["token"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_derives_name_from_email() {
        let app = test_app();

        let response = app
            .router
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                json!({"email": "jane.q_doe@example.com", "password": "Sup3r-secret"}),
            ))
            .await
            .unwrap();

        let body = read_json(response).await;
        assert_eq!(body["user"]["name"], "jane q doe");
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let app = test_app();

        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                json!({"email": "not-an-email", "password": "Sup3r-secret"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .router
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                json!({"email": "user@example.com", "password": "weak"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_conflict() {
        let app = test_app();
        let request =
            || json_request(
                "POST",
                "/api/auth/register",
                json!({"email": "dup@example.com", "password": "Sup3r-secret"}),
            );

        let first = app.router.clone().oneshot(request()).await.unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app.router.oneshot(request()).await.unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_login_roundtrip() {
        let app = test_app();

        app.router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                json!({"email": "user@example.com", "password": "Sup3r-secret"}),
            ))
            .await
            .unwrap();

        let response = app
            .router
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                json!({"email": "User@Example.com", "password": "Sup3r-secret"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["message"], "Login successful");
        assert!(!body["token"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_invalid_credentials_are_uniform() {
        let app = test_app();

        app.router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                json!({"email": "user@example.com", "password": "Sup3r-secret"}),
            ))
            .await
            .unwrap();

        // Wrong password
        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                json!({"email": "user@example.com", "password": "Wr0ng-secret"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // Unknown user
        let response = app
            .router
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                json!({"email": "ghost@example.com", "password": "Sup3r-secret"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_profile_requires_and_honors_token() {
        let app = test_app();

        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                json!({"email": "user@example.com", "password": "Sup3r-secret"}),
            ))
            .await
            .unwrap();
        let body = read_json(response).await;
        let token = body["token"].as_str().unwrap().to_string();

        // No token
        let response = app
            .router
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/auth/profile")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // Garbage token
        let response = app
            .router
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/auth/profile")
                    .header("authorization", "Bearer not.a.token")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // Valid token
        let response = app
            .router
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/auth/profile")
                    .header("authorization", format!("Bearer {}", token))
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["email"], "user@example.com");
        assert!(body["createdAt"].is_string());
    }
}
