//! Authentication routes.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};

use trendmart_core::UserRole;

use crate::db::users::UserRepository;
use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::User;
use crate::services::AuthService;
use crate::state::AppState;

/// Request to start a registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub full_name: String,
    pub password: String,
}

/// Request to verify a registration code.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub email: String,
    pub code: String,
}

/// Login credentials.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// A token alongside the account it belongs to.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Start a customer registration and email the verification code.
pub async fn request_registration(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let auth = AuthService::new(state.pool(), &state.config().jwt_secret);
    let (user, code) = auth
        .request_registration(&request.email, &request.full_name, &request.password)
        .await?;

    state
        .email()
        .send_verification_code(user.email.as_str(), &code)
        .await
        .map_err(|e| AppError::Internal(format!("verification email failed: {e}")))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "message": "verification code sent" })),
    ))
}

/// Verify the emailed code and activate the account.
pub async fn verify_registration(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let auth = AuthService::new(state.pool(), &state.config().jwt_secret);
    let authenticated = auth
        .verify_registration(&request.email, &request.code)
        .await?;

    Ok(Json(AuthResponse {
        token: authenticated.token,
        user: authenticated.user,
    }))
}

/// Customer login.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    login_as(&state, &request, UserRole::Customer).await
}

/// Admin login.
pub async fn admin_login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    login_as(&state, &request, UserRole::Admin).await
}

async fn login_as(
    state: &AppState,
    request: &LoginRequest,
    role: UserRole,
) -> Result<Json<AuthResponse>, AppError> {
    let auth = AuthService::new(state.pool(), &state.config().jwt_secret);
    let authenticated = auth.login(&request.email, &request.password, role).await?;

    Ok(Json(AuthResponse {
        token: authenticated.token,
        user: authenticated.user,
    }))
}

/// The account behind the presented token.
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<User>, AppError> {
    let user = UserRepository::new(state.pool())
        .get_by_id(current.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("account not found".to_owned()))?;

    Ok(Json(user))
}
