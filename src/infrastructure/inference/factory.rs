use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{LocalClassifier, RemoteClassifier};
use crate::config::{InferenceConfig, InferenceStrategy};
use crate::domain::{DomainError, ImageClassifier};
use crate::infrastructure::http_client::HttpClient;

/// Factory for creating the configured classification strategy
#[derive(Debug)]
pub struct ClassifierFactory;

impl ClassifierFactory {
    /// Build the classifier selected by `config.strategy`.
    ///
    /// The local strategy loads its weights here, so a missing or mismatched
    /// artifact fails startup.
    pub fn create(config: &InferenceConfig) -> Result<Arc<dyn ImageClassifier>, DomainError> {
        match config.strategy {
            InferenceStrategy::Local => {
                info!(weights = %config.weights_path.display(), "Using local classifier");
                let classifier = LocalClassifier::load(&config.weights_path)?;
                Ok(Arc::new(classifier))
            }

            InferenceStrategy::Remote => {
                let url = config
                    .remote_url
                    .as_deref()
                    .filter(|url| !url.trim().is_empty())
                    .ok_or_else(|| {
                        DomainError::configuration(
                            "inference.remote_url is required for the remote strategy",
                        )
                    })?;

                info!(url = %url, "Using remote classifier");

                let client = HttpClient::with_timeout(Duration::from_secs(config.timeout_secs))?;
                let classifier = RemoteClassifier::new(client, url, config.remote_api_key.clone());
                Ok(Arc::new(classifier))
            }
        }
    }
}
