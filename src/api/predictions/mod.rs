//! Prediction endpoints
//!
//! `POST /predict` classifies one uploaded MRI scan, `GET /history` lists a
//! user's earlier results.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
        Multipart, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::types::{ApiError, ApiErrorType, Json};
use crate::domain::{PredictionRecord, TumorClass};
use crate::infrastructure::services::UploadedImage;

/// Multipart field carrying the image
const FILE_FIELD: &str = "file";

/// Create the prediction router
pub fn create_predictions_router() -> Router<AppState> {
    Router::new()
        .route("/predict", post(predict))
        .route("/history", get(history))
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user: String,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub class: TumorClass,
    pub confidence: f64,
    pub image_url: String,
}

impl From<&PredictionRecord> for PredictResponse {
    fn from(record: &PredictionRecord) -> Self {
        Self {
            class: record.prediction(),
            confidence: record.confidence(),
            image_url: record.image_url().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryItem {
    pub user: String,
    pub image: String,
    pub original_filename: Option<String>,
    pub image_url: String,
    pub prediction: TumorClass,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<PredictionRecord> for HistoryItem {
    fn from(record: PredictionRecord) -> Self {
        Self {
            user: record.user().to_string(),
            image: record.image().to_string(),
            original_filename: record.original_filename().map(str::to_string),
            image_url: record.image_url().to_string(),
            prediction: record.prediction(),
            confidence: record.confidence(),
            timestamp: record.timestamp(),
        }
    }
}

/// Classify an uploaded scan
///
/// POST /predict?user=<email>
pub async fn predict(
    State(state): State<AppState>,
    query: Result<Query<UserQuery>, QueryRejection>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Query(query) = query.map_err(query_error)?;
    let mut multipart = multipart.map_err(|e| {
        ApiError::new(e.status(), ApiErrorType::InvalidRequestError, e.body_text())
    })?;

    let image = read_image(&mut multipart).await?;
    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());

    let record = state
        .prediction_service
        .predict(&query.user, image, host)
        .await?;

    Ok(Json(PredictResponse::from(&record)))
}

/// A user's predictions, newest first
///
/// GET /history?user=<email>
pub async fn history(
    State(state): State<AppState>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Json<Vec<HistoryItem>>, ApiError> {
    let Query(query) = query.map_err(query_error)?;

    let records = state.prediction_service.history(&query.user).await?;

    Ok(Json(records.into_iter().map(HistoryItem::from).collect()))
}

fn query_error(rejection: QueryRejection) -> ApiError {
    ApiError::bad_request(rejection.body_text()).with_param("user")
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::payload_too_large("Uploaded file is too large").with_param(FILE_FIELD);
    }

    ApiError::bad_request(err.body_text()).with_param(FILE_FIELD)
}

/// Pull the `file` field out of the form; other fields are skipped
async fn read_image(multipart: &mut Multipart) -> Result<UploadedImage, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        return Ok(UploadedImage {
            bytes,
            filename,
            content_type,
        });
    }

    Err(ApiError::bad_request("Missing multipart field 'file'").with_param(FILE_FIELD))
}
