//! MRI Inference Gateway
//!
//! Classifies brain MRI scans into four classes with a fused CNN + ViT model
//! and serves the result over HTTP, with support for:
//! - Local (candle) or remote classification
//! - Per-user prediction history in memory or PostgreSQL
//! - Account registration and login
//! - An educational assistant backed by an OpenAI-compatible endpoint

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use api::state::AppState;
use domain::{LlmProvider, PredictionRecord, User};
use infrastructure::{
    http_client::HttpClient,
    inference::ClassifierFactory,
    llm::OpenAiProvider,
    services::{AssistantService, AssistantSettings, PredictionService},
    storage::StorageFactory,
    uploads::UploadStore,
    user::{Argon2Hasher, UserService},
};
use tracing::info;

/// Create the application state with all services initialized
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let storage = StorageFactory::connect(&config.storage).await?;
    info!(backend = ?storage.backend(), "Storage ready");

    let classifier = ClassifierFactory::create(&config.inference)?;
    info!(strategy = classifier.strategy_name(), "Classifier ready");

    let uploads = UploadStore::from_config(&config.uploads);
    uploads.ensure_dir().await?;

    let prediction_service = PredictionService::new(
        classifier,
        uploads,
        storage.create::<PredictionRecord>().await?,
        Duration::from_secs(config.inference.timeout_secs),
    );

    let user_service = UserService::new(
        storage.create::<User>().await?,
        Arc::new(Argon2Hasher::new()),
    );

    let assistant_service = AssistantService::new(
        create_assistant_provider(config)?,
        AssistantSettings {
            model: config.assistant.model.clone(),
            temperature: config.assistant.temperature,
            max_tokens: config.assistant.max_tokens,
        },
    );

    Ok(AppState::new(
        Arc::new(user_service),
        Arc::new(prediction_service),
        Arc::new(assistant_service),
    ))
}

/// Chat provider for the assistant; `None` without an API key
fn create_assistant_provider(config: &AppConfig) -> anyhow::Result<Option<Arc<dyn LlmProvider>>> {
    let Some(api_key) = config.assistant.resolve_api_key() else {
        return Ok(None);
    };

    let client = HttpClient::with_timeout(Duration::from_secs(config.assistant.timeout_secs))?;
    let provider = OpenAiProvider::with_base_url(client, api_key, &config.assistant.base_url);

    info!(
        base_url = %config.assistant.base_url,
        model = %config.assistant.model,
        "Assistant provider configured"
    );

    Ok(Some(Arc::new(provider)))
}
