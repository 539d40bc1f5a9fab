//! In-process classification with the fused CNN/ViT network

use async_trait::async_trait;
use candle_core::Device;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

use super::loader::load_fused_classifier;
use super::model::FusedClassifier;
use super::preprocess::ImagePreprocessor;
use crate::domain::{DomainError, ImageClassifier, Prediction};

/// Classifier running the network on the blocking thread pool.
///
/// The network is loaded once and shared read-only between requests; cloning
/// the classifier only bumps the reference count. At most one forward pass
/// per CPU runs at a time. A pass abandoned by its caller keeps its permit
/// until it finishes.
#[derive(Clone)]
pub struct LocalClassifier {
    model: Arc<FusedClassifier>,
    preprocessor: ImagePreprocessor,
    permits: Arc<Semaphore>,
    source: Option<PathBuf>,
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
}

impl LocalClassifier {
    pub fn new(model: FusedClassifier, preprocessor: ImagePreprocessor) -> Self {
        Self {
            model: Arc::new(model),
            preprocessor,
            permits: Arc::new(Semaphore::new(num_cpus())),
            source: None,
        }
    }

    /// Limit concurrent forward passes to `max` (at least one)
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(max.max(1)));
        self
    }

    /// Forward passes that could start right now
    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }

    /// Load the weights artifact at `weights_path` onto the CPU
    pub fn load(weights_path: &Path) -> Result<Self, DomainError> {
        let device = Device::Cpu;
        let model = load_fused_classifier(weights_path, &device)?;

        Ok(Self {
            source: Some(weights_path.to_path_buf()),
            ..Self::new(model, ImagePreprocessor::new(device))
        })
    }

    /// Classify the image at `path` on the calling thread
    pub fn predict_image(&self, path: &Path) -> Result<Prediction, DomainError> {
        let input = self.preprocessor.preprocess_path(path)?;
        self.run(&input)
    }

    /// Classify encoded image bytes on the calling thread
    pub fn predict_bytes(&self, bytes: &[u8]) -> Result<Prediction, DomainError> {
        let input = self.preprocessor.preprocess_bytes(bytes)?;
        self.run(&input)
    }

    fn run(&self, input: &candle_core::Tensor) -> Result<Prediction, DomainError> {
        let forward = || -> candle_core::Result<Vec<f32>> {
            let output = self.model.forward(input)?;
            output.logits.squeeze(0)?.to_vec1::<f32>()
        };

        let logits = forward()
            .map_err(|e| DomainError::inference(format!("Forward pass failed: {}", e)))?;

        debug!(logits = ?logits, "Forward pass complete");

        Prediction::from_logits(&logits)
    }
}

impl fmt::Debug for LocalClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalClassifier")
            .field("source", &self.source)
            .field("available_slots", &self.available_slots())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ImageClassifier for LocalClassifier {
    async fn classify(&self, path: &Path) -> Result<Prediction, DomainError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| DomainError::internal(format!("Inference slots closed: {}", e)))?;

        let classifier = self.clone();
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let result = classifier.predict_image(&path);
            drop(permit);
            result
        })
        .await
        .map_err(|e| DomainError::internal(format!("Inference task failed: {}", e)))?
    }

    fn strategy_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TumorClass;
    use crate::infrastructure::inference::loader::fixture::no_tumor_model;
    use crate::infrastructure::inference::preprocess::fixture::{encode, gradient_rgb, zero_png};
    use image::ImageFormat;
    use std::time::Duration;

    fn classifier() -> LocalClassifier {
        LocalClassifier::new(no_tumor_model(), ImagePreprocessor::default())
    }

    #[test]
    fn test_zero_image_with_no_tumor_fixture() {
        let prediction = classifier().predict_bytes(&zero_png()).unwrap();

        assert_eq!(prediction.class, TumorClass::NoTumor);
        assert_eq!(prediction.confidence, 100.0);
    }

    #[test]
    fn test_corrupt_bytes_are_invalid_image() {
        let result = classifier().predict_bytes(b"\x89PNG\r\n\x1a\ntruncated");
        assert!(matches!(result, Err(DomainError::InvalidImage { .. })));
    }

    #[tokio::test]
    async fn test_classify_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.jpg");
        std::fs::write(&path, encode(&gradient_rgb(512, 512), ImageFormat::Jpeg)).unwrap();

        let classifier = classifier();
        let first = classifier.classify(&path).await.unwrap();
        let second = classifier.classify(&path).await.unwrap();

        assert_eq!(first, second);
        assert!(TumorClass::ALL.contains(&first.class));
        assert!((0.0..=100.0).contains(&first.confidence));
    }

    #[tokio::test]
    async fn test_classify_non_image_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.png");
        std::fs::write(&path, b"plain text").unwrap();

        let result = classifier().classify(&path).await;
        assert!(matches!(result, Err(DomainError::InvalidImage { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_classifications_share_slots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, zero_png()).unwrap();

        let classifier = classifier().with_max_concurrency(1);
        let (first, second) = tokio::join!(classifier.classify(&path), classifier.classify(&path));

        assert_eq!(first.unwrap().class, TumorClass::NoTumor);
        assert_eq!(second.unwrap().class, TumorClass::NoTumor);
        assert_eq!(classifier.available_slots(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_classification_releases_slot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, zero_png()).unwrap();

        let classifier = classifier().with_max_concurrency(1);
        let _ = tokio::time::timeout(Duration::from_nanos(1), classifier.classify(&path)).await;

        let prediction = tokio::time::timeout(Duration::from_secs(30), classifier.classify(&path))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(prediction.class, TumorClass::NoTumor);
        assert_eq!(classifier.available_slots(), 1);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        assert_eq!(classifier().with_max_concurrency(0).available_slots(), 1);
        assert!(classifier().available_slots() >= 1);
    }

    #[test]
    fn test_load_missing_weights() {
        let result = LocalClassifier::load(Path::new("/nonexistent/model.safetensors"));
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[test]
    fn test_strategy_name() {
        assert_eq!(classifier().strategy_name(), "local");
    }
}
