//! Classification delegated to a remote inference endpoint

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

use crate::domain::{DomainError, ImageClassifier, Prediction, TumorClass};
use crate::infrastructure::http_client::HttpClientTrait;

const PROVIDER: &str = "remote-classifier";

#[derive(Debug, Deserialize)]
struct RemotePrediction {
    class: String,
    confidence: f64,
}

/// Posts the image as base64 JSON and validates the returned prediction.
///
/// Request: `{"image": "<base64>", "filename": "<name>"}`.
/// Response: `{"class": "<label>", "confidence": <0..100>}`.
#[derive(Debug)]
pub struct RemoteClassifier<C: HttpClientTrait> {
    client: C,
    url: String,
    auth_header: Option<String>,
}

impl<C: HttpClientTrait> RemoteClassifier<C> {
    pub fn new(client: C, url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            url: url.into(),
            auth_header: api_key
                .filter(|key| !key.is_empty())
                .map(|key| format!("Bearer {}", key)),
        }
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        let mut headers = vec![("Content-Type", "application/json")];

        if let Some(ref auth) = self.auth_header {
            headers.push(("Authorization", auth.as_str()));
        }

        headers
    }

    fn parse_response(json: serde_json::Value) -> Result<Prediction, DomainError> {
        let remote: RemotePrediction = serde_json::from_value(json).map_err(|e| {
            DomainError::provider(PROVIDER, format!("Malformed prediction: {}", e))
        })?;

        let class: TumorClass = remote.class.parse().map_err(|_| {
            DomainError::provider(PROVIDER, format!("Unknown label '{}'", remote.class))
        })?;

        Prediction::new(class, remote.confidence).map_err(|_| {
            DomainError::provider(
                PROVIDER,
                format!("Confidence {} is outside [0, 100]", remote.confidence),
            )
        })
    }
}

#[async_trait]
impl<C: HttpClientTrait> ImageClassifier for RemoteClassifier<C> {
    async fn classify(&self, path: &Path) -> Result<Prediction, DomainError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            DomainError::invalid_image(format!("Cannot read {}: {}", path.display(), e))
        })?;

        // Reject non-images locally instead of paying for a round trip
        image::guess_format(&bytes)
            .map_err(|e| DomainError::invalid_image(format!("Unrecognized image format: {}", e)))?;

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let body = serde_json::json!({
            "image": BASE64.encode(&bytes),
            "filename": filename,
        });

        debug!(url = %self.url, bytes = bytes.len(), "Sending image to remote classifier");

        let response = self.client.post_json(&self.url, self.headers(), &body).await?;

        Self::parse_response(response)
    }

    fn strategy_name(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_client::mock::MockHttpClient;
    use crate::infrastructure::inference::preprocess::fixture::zero_png;
    use serde_json::json;

    const URL: &str = "http://inference.local/predict";

    fn scan_file() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, zero_png()).unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn test_classify_success() {
        let client = MockHttpClient::new()
            .with_response(URL, json!({"class": "meningioma", "confidence": 73.456}));
        let classifier = RemoteClassifier::new(client, URL, Some("token".to_string()));
        let (_dir, path) = scan_file();

        let prediction = classifier.classify(&path).await.unwrap();

        assert_eq!(prediction.class, TumorClass::Meningioma);
        assert_eq!(prediction.confidence, 73.46);

        let body = classifier.client.last_body().unwrap();
        assert_eq!(body["filename"], "scan.png");
        assert_eq!(
            BASE64.decode(body["image"].as_str().unwrap()).unwrap(),
            zero_png()
        );
        assert_eq!(
            classifier.client.last_header("authorization").as_deref(),
            Some("Bearer token")
        );
    }

    #[tokio::test]
    async fn test_unknown_label_rejected() {
        let client = MockHttpClient::new()
            .with_response(URL, json!({"class": "astrocytoma", "confidence": 90.0}));
        let classifier = RemoteClassifier::new(client, URL, None);
        let (_dir, path) = scan_file();

        let result = classifier.classify(&path).await;
        assert!(matches!(result, Err(DomainError::Provider { .. })));
    }

    #[tokio::test]
    async fn test_out_of_range_confidence_rejected() {
        let client = MockHttpClient::new()
            .with_response(URL, json!({"class": "glioma", "confidence": 140.0}));
        let classifier = RemoteClassifier::new(client, URL, None);
        let (_dir, path) = scan_file();

        let result = classifier.classify(&path).await;
        assert!(matches!(result, Err(DomainError::Provider { .. })));
    }

    #[tokio::test]
    async fn test_malformed_response_rejected() {
        let client = MockHttpClient::new().with_response(URL, json!({"label": "glioma"}));
        let classifier = RemoteClassifier::new(client, URL, None);
        let (_dir, path) = scan_file();

        assert!(classifier.classify(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_non_image_never_sent() {
        let classifier = RemoteClassifier::new(MockHttpClient::new(), URL, None);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.png");
        std::fs::write(&path, b"plain text").unwrap();

        let result = classifier.classify(&path).await;

        assert!(matches!(result, Err(DomainError::InvalidImage { .. })));
        assert_eq!(classifier.client.request_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let client = MockHttpClient::new().with_error(URL, "connection refused");
        let classifier = RemoteClassifier::new(client, URL, None);
        let (_dir, path) = scan_file();

        let result = classifier.classify(&path).await;
        assert!(matches!(result, Err(DomainError::Provider { .. })));
        assert_eq!(classifier.strategy_name(), "remote");
    }
}
