//! Account and session handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use salesforge_common::{
    auth::{self, AuthContext},
    errors::{AppError, Result},
};

/// Request to register a new account
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub email: String,
}

/// Register a new user and issue a token
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>)> {
    request.validate().map_err(|e| AppError::InvalidRequest {
        message: e.to_string(),
    })?;

    if state
        .repo
        .find_user_by_email(&request.email)
        .await?
        .is_some()
    {
        return Err(AppError::EmailTaken);
    }

    let password_hash = auth::hash_password(&request.password)?;
    let user = state.repo.create_user(request.email, password_hash).await?;

    tracing::info!(user_id = %user.id, "User registered");

    let token = state.jwt.generate_token(user.id)?;
    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

/// Log in with email and password
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let user = state
        .repo
        .find_user_by_email(&request.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !auth::verify_password(&request.password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }

    let token = state.jwt.generate_token(user.id)?;
    Ok(Json(TokenResponse { token }))
}

/// Get current user info
pub async fn me(State(state): State<AppState>, auth: AuthContext) -> Result<Json<MeResponse>> {
    let user = state
        .repo
        .find_user_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized {
            message: "User no longer exists".to_string(),
        })?;

    Ok(Json(MeResponse { email: user.email }))
}
