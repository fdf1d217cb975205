use crate::api::routes::AppState;
use crate::errors::{AppError, Result};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

/// Bearer token authentication middleware.
///
/// Validates the Authorization header and stashes the decoded claims in
/// the request extensions for downstream handlers.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = extract_bearer(request.headers())?;
    let claims = state.jwt.validate_token(token)?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Pull the token out of an `Authorization: Bearer <token>` header
fn extract_bearer(headers: &HeaderMap) -> Result<&str> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    auth_header
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or(AppError::Unauthorized)
}
