//! Authentication extractors for route handlers.
//!
//! Identity arrives as a `Bearer` token in the `Authorization` header;
//! the extractors verify it against the configured signing secret.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use trendmart_core::{UserId, UserRole};

use crate::error::AppError;
use crate::services::auth::verify_token;
use crate::state::AppState;

/// The verified identity of the caller.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub user_id: UserId,
    pub role: UserRole,
}

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("user {}", user.user_id)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a valid bearer token for an admin account.
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state)?;
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state)?;
        if user.role != UserRole::Admin {
            return Err(AppError::Forbidden("admin access required".to_owned()));
        }
        Ok(Self(user))
    }
}

/// Pull and verify the bearer token from the request headers.
fn authenticate(parts: &Parts, state: &AppState) -> Result<CurrentUser, AppError> {
    let header_value = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_owned()))?;

    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("malformed authorization header".to_owned()))?;

    let (user_id, role) = verify_token(&state.config().jwt_secret, token)
        .map_err(|_| AppError::Unauthorized("invalid or expired token".to_owned()))?;

    Ok(CurrentUser { user_id, role })
}
