//! Prediction service - classify uploads and keep per-user history

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{info, warn};

use crate::domain::storage::Storage;
use crate::domain::{DomainError, ImageClassifier, PredictionRecord};
use crate::infrastructure::uploads::UploadStore;

/// An image received from a client
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Bytes,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

/// History is keyed by the trimmed, lowercased user identifier
fn normalize_user(user: &str) -> String {
    user.trim().to_lowercase()
}

/// Prediction service: store upload, classify, persist the record
#[derive(Debug)]
pub struct PredictionService {
    classifier: Arc<dyn ImageClassifier>,
    uploads: UploadStore,
    storage: Arc<dyn Storage<PredictionRecord>>,
    timeout: Duration,
}

impl PredictionService {
    pub fn new(
        classifier: Arc<dyn ImageClassifier>,
        uploads: UploadStore,
        storage: Arc<dyn Storage<PredictionRecord>>,
        timeout: Duration,
    ) -> Self {
        Self {
            classifier,
            uploads,
            storage,
            timeout,
        }
    }

    pub fn classifier(&self) -> &Arc<dyn ImageClassifier> {
        &self.classifier
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    /// Classify an uploaded image for `user` and record the result.
    ///
    /// `host` is the request's `Host` header, used for the image URL when no
    /// public base URL is configured. Uploads without a persisted record are
    /// removed again.
    pub async fn predict(
        &self,
        user: &str,
        image: UploadedImage,
        host: Option<&str>,
    ) -> Result<PredictionRecord, DomainError> {
        if image.bytes.is_empty() {
            return Err(DomainError::invalid_image("Uploaded file is empty"));
        }

        let user = normalize_user(user);
        let stored = self
            .uploads
            .save(
                &image.bytes,
                image.filename.as_deref(),
                image.content_type.as_deref(),
                host,
            )
            .await?;

        let path = self.uploads.path_of(&stored.file_name);

        let prediction = match tokio::time::timeout(self.timeout, self.classifier.classify(&path)).await {
            Ok(Ok(prediction)) => prediction,
            Ok(Err(e)) => {
                self.uploads.remove(&stored.file_name).await;
                return Err(e);
            }
            Err(_) => {
                self.uploads.remove(&stored.file_name).await;
                warn!(
                    strategy = self.classifier.strategy_name(),
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Classification timed out"
                );
                return Err(DomainError::inference(format!(
                    "Classification timed out after {:?}",
                    self.timeout
                )));
            }
        };

        let file_name = stored.file_name.clone();
        let record = match self
            .storage
            .create(PredictionRecord::new(user, stored, prediction))
            .await
        {
            Ok(record) => record,
            Err(e) => {
                self.uploads.remove(&file_name).await;
                return Err(e);
            }
        };

        info!(
            user = %record.user(),
            image = %record.image(),
            class = %record.prediction(),
            confidence = record.confidence(),
            "Prediction recorded"
        );

        Ok(record)
    }

    /// A user's predictions, newest first
    pub async fn history(&self, user: &str) -> Result<Vec<PredictionRecord>, DomainError> {
        let mut records = self.storage.find_by("user", &normalize_user(user)).await?;
        records.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        Ok(records)
    }

    /// Number of stored predictions; also serves as a storage round-trip
    pub async fn record_count(&self) -> Result<usize, DomainError> {
        self.storage.count().await
    }
}
