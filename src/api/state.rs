//! Application state for shared services

use std::sync::Arc;

use crate::domain::{DomainError, User};
use crate::infrastructure::services::{AssistantService, PredictionService};
use crate::infrastructure::user::{PasswordHasher, UserService};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<dyn UserServiceTrait>,
    pub prediction_service: Arc<PredictionService>,
    pub assistant_service: Arc<AssistantService>,
}

impl AppState {
    pub fn new(
        user_service: Arc<dyn UserServiceTrait>,
        prediction_service: Arc<PredictionService>,
        assistant_service: Arc<AssistantService>,
    ) -> Self {
        Self {
            user_service,
            prediction_service,
            assistant_service,
        }
    }
}

/// Trait for account operations, erasing the password hasher type
#[async_trait::async_trait]
pub trait UserServiceTrait: Send + Sync {
    async fn register(&self, email: &str, password: &str) -> Result<User, DomainError>;
    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, DomainError>;
}

#[async_trait::async_trait]
impl<H: PasswordHasher + 'static> UserServiceTrait for UserService<H> {
    async fn register(&self, email: &str, password: &str) -> Result<User, DomainError> {
        UserService::register(self, email, password).await
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, DomainError> {
        UserService::authenticate(self, email, password).await
    }
}
