//! Persisted prediction record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::classifier::{Prediction, TumorClass};
use crate::domain::storage::{StorageEntity, StorageKey};

/// Unique identifier of a prediction record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredictionRecordId(String);

impl PredictionRecordId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl StorageKey for PredictionRecordId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PredictionRecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an uploaded image ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Name of the file inside the upload directory
    pub file_name: String,
    /// Name the client uploaded the file under, if any
    pub original_filename: Option<String>,
    /// Absolute URL the image is served from
    pub url: String,
}

/// A prediction made for a user, kept for their history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    id: PredictionRecordId,
    user: String,
    image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    original_filename: Option<String>,
    image_url: String,
    prediction: TumorClass,
    confidence: f64,
    timestamp: DateTime<Utc>,
}

impl PredictionRecord {
    /// Record `prediction` for `user`, timestamped now
    pub fn new(user: impl Into<String>, image: StoredImage, prediction: Prediction) -> Self {
        Self {
            id: PredictionRecordId::generate(),
            user: user.into(),
            image: image.file_name,
            original_filename: image.original_filename,
            image_url: image.url,
            prediction: prediction.class,
            confidence: prediction.confidence,
            timestamp: Utc::now(),
        }
    }

    /// Override the timestamp (imports, tests)
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn id(&self) -> &PredictionRecordId {
        &self.id
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn original_filename(&self) -> Option<&str> {
        self.original_filename.as_deref()
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    pub fn prediction(&self) -> TumorClass {
        self.prediction
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl StorageEntity for PredictionRecord {
    type Key = PredictionRecordId;
    const COLLECTION: &'static str = "predictions";

    fn key(&self) -> &Self::Key {
        &self.id
    }
}
