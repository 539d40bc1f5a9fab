//! Educational assistant endpoint

use axum::{extract::State, routing::post, Router};
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::user::normalize_email;

/// Create the assistant router
pub fn create_assistant_router() -> Router<AppState> {
    Router::new().route("/chat", post(chat))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user: String,
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
}

/// Ask the assistant a question
///
/// POST /chat
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let user = normalize_email(&request.user)
        .map_err(|e| ApiError::bad_request(e.to_string()).with_param("user"))?;

    let answer = state
        .assistant_service
        .ask(&user, &request.question)
        .await?;

    Ok(Json(ChatResponse { answer }))
}
