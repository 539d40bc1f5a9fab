//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, AssistantConfig, CorsConfig, InferenceConfig, InferenceStrategy, LogFormat,
    LoggingConfig, ServerConfig, StorageBackend, StorageConfig, UploadsConfig,
};
