use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::assistant;
use super::auth;
use super::health;
use super::predictions;
use super::state::AppState;
use super::types::Json;
use crate::config::{AppConfig, CorsConfig};
use crate::infrastructure::uploads::UPLOADS_ROUTE;

/// Create the full router with application state
pub fn create_router(state: AppState, config: &AppConfig) -> Router {
    let uploads_dir = state.prediction_service.uploads().dir().to_path_buf();

    Router::new()
        .route("/", get(root))
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        .merge(auth::create_auth_router())
        .merge(predictions::create_predictions_router())
        .merge(assistant::create_assistant_router())
        // Stored uploads, referenced by the image URLs handed out
        .nest_service(UPLOADS_ROUTE, ServeDir::new(uploads_dir))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.uploads.max_bytes))
        .layer(cors_layer(&config.cors))
        .layer(TraceLayer::new_for_http())
}

async fn root() -> Json<Value> {
    Json(json!({ "status": "Backend running" }))
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.allowed_origins.iter().any(|origin| origin.trim() == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
