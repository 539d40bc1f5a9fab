use async_trait::async_trait;
use std::fmt::Debug;
use std::path::Path;

use super::Prediction;
use crate::domain::DomainError;

/// Trait for image classification strategies (in-process model, remote endpoint)
#[async_trait]
pub trait ImageClassifier: Send + Sync + Debug {
    /// Classify the image stored at `path`.
    ///
    /// Fails with `DomainError::InvalidImage` when the file is not a decodable image.
    async fn classify(&self, path: &Path) -> Result<Prediction, DomainError>;

    /// Name of the strategy, used in logs and readiness checks
    fn strategy_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Classifier returning a fixed prediction or error
    #[derive(Debug)]
    pub struct StaticClassifier {
        prediction: Option<Prediction>,
        error: Option<String>,
        calls: AtomicUsize,
    }

    impl StaticClassifier {
        pub fn new(prediction: Prediction) -> Self {
            Self {
                prediction: Some(prediction),
                error: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(error: impl Into<String>) -> Self {
            Self {
                prediction: None,
                error: Some(error.into()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageClassifier for StaticClassifier {
        async fn classify(&self, _path: &Path) -> Result<Prediction, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(ref error) = self.error {
                return Err(DomainError::invalid_image(error));
            }

            self.prediction
                .ok_or_else(|| DomainError::internal("No mock prediction configured"))
        }

        fn strategy_name(&self) -> &'static str {
            "static"
        }
    }
}
