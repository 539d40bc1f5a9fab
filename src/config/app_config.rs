use serde::Deserialize;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub inference: InferenceConfig,
    pub storage: StorageConfig,
    pub uploads: UploadsConfig,
    pub assistant: AssistantConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Where classification runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InferenceStrategy {
    #[default]
    Local,
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub strategy: InferenceStrategy,
    /// Weights artifact for the local strategy
    pub weights_path: PathBuf,
    /// Endpoint for the remote strategy
    pub remote_url: Option<String>,
    pub remote_api_key: Option<String>,
    /// Upper bound on a single classification
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Connection string for the postgres backend; falls back to `DATABASE_URL`
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadsConfig {
    pub dir: PathBuf,
    /// Base of the URLs handed back to clients, e.g. `https://api.example.com`.
    /// When unset the request's `Host` header is used.
    pub public_base_url: Option<String>,
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub base_url: String,
    pub model: String,
    /// Falls back to the `HF_API_KEY` environment variable
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// `*` allows any origin
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            strategy: InferenceStrategy::default(),
            weights_path: PathBuf::from("model/brain_tumor_rsc_model.safetensors"),
            remote_url: None,
            remote_api_key: None,
            timeout_secs: 30,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            url: None,
            max_connections: 5,
        }
    }
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploads"),
            public_base_url: None,
            max_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: "https://router.huggingface.co".to_string(),
            model: "mistralai/Mistral-7B-Instruct-v0.2:together".to_string(),
            api_key: None,
            temperature: 0.4,
            max_tokens: 1000,
            timeout_secs: 60,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

impl AssistantConfig {
    /// Configured key, else `HF_API_KEY`; blank keys count as missing
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("HF_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }
}

impl StorageConfig {
    pub fn resolve_url(&self) -> Option<String> {
        self.url
            .clone()
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .filter(|url| !url.trim().is_empty())
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
