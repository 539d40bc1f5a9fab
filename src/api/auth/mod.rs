//! Account endpoints
//!
//! Registration and a credential check; no session or token is issued.

use axum::{extract::State, routing::post, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};

/// Create the account router
pub fn create_auth_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Credentials sent to both endpoints
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub email: String,
}

/// Register a new account
///
/// POST /register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .user_service
        .register(&request.email, &request.password)
        .await?;

    Ok(Json(MessageResponse {
        message: "User registered successfully".to_string(),
    }))
}

/// Check an email and password
///
/// POST /login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .user_service
        .authenticate(&request.email, &request.password)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    info!(email = %user.email(), "User logged in");

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        email: user.email().to_string(),
    }))
}
