//! Liveness and readiness probes

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use super::state::AppState;
use crate::api::types::Json;

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// One dependency looked at by `/ready`
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub name: &'static str,
    pub status: ProbeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub status: ProbeStatus,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl ProbeResponse {
    fn new(status: ProbeStatus) -> Self {
        Self {
            status,
            version: env!("CARGO_PKG_VERSION"),
            components: Vec::new(),
            latency_ms: None,
        }
    }
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(ProbeResponse::new(ProbeStatus::Healthy))
}

/// GET /live
pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}

/// GET /ready
///
/// Storage must answer; a missing assistant key only degrades the service.
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();

    let storage = match state.prediction_service.record_count().await {
        Ok(count) => ComponentStatus {
            name: "storage",
            status: ProbeStatus::Healthy,
            detail: Some(format!("{} predictions", count)),
        },
        Err(e) => ComponentStatus {
            name: "storage",
            status: ProbeStatus::Unhealthy,
            detail: Some(e.to_string()),
        },
    };

    let classifier = ComponentStatus {
        name: "classifier",
        status: ProbeStatus::Healthy,
        detail: Some(
            state
                .prediction_service
                .classifier()
                .strategy_name()
                .to_string(),
        ),
    };

    let assistant = ComponentStatus {
        name: "assistant",
        status: if state.assistant_service.is_configured() {
            ProbeStatus::Healthy
        } else {
            ProbeStatus::Degraded
        },
        detail: None,
    };

    let components = vec![storage, classifier, assistant];
    let status = overall_status(&components);

    let response = ProbeResponse {
        components,
        latency_ms: Some(start.elapsed().as_millis() as u64),
        ..ProbeResponse::new(status)
    };

    let code = match status {
        ProbeStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        ProbeStatus::Healthy | ProbeStatus::Degraded => StatusCode::OK,
    };

    (code, Json(response))
}

/// Worst status among the components
fn overall_status(components: &[ComponentStatus]) -> ProbeStatus {
    if components.iter().any(|c| c.status == ProbeStatus::Unhealthy) {
        ProbeStatus::Unhealthy
    } else if components.iter().any(|c| c.status == ProbeStatus::Degraded) {
        ProbeStatus::Degraded
    } else {
        ProbeStatus::Healthy
    }
}
