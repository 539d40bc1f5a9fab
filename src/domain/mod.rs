//! Domain layer - Core business logic and entities

pub mod classifier;
pub mod error;
pub mod llm;
pub mod prediction;
pub mod storage;
pub mod user;

pub use classifier::{ImageClassifier, Prediction, TumorClass};
pub use error::DomainError;
pub use llm::{FinishReason, LlmProvider, LlmRequest, LlmResponse, Message, MessageRole, Usage};
pub use prediction::{PredictionRecord, PredictionRecordId, StoredImage};
pub use storage::{Storage, StorageEntity, StorageKey};
pub use user::{User, UserEmail};
