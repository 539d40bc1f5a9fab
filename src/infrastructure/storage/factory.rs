//! Storage factory for runtime backend selection

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};
use crate::domain::storage::{Storage, StorageEntity};
use crate::domain::DomainError;

use super::in_memory::InMemoryStorage;
use super::postgres::{PostgresConfig, PostgresStorage};

/// Opened storage backend, able to hand out one collection per entity type
#[derive(Debug, Clone)]
pub enum StorageFactory {
    InMemory,
    Postgres(PgPool),
}

impl StorageFactory {
    /// Open the backend selected by configuration.
    ///
    /// The postgres backend needs `storage.url` or `DATABASE_URL`.
    pub async fn connect(config: &StorageConfig) -> Result<Self, DomainError> {
        match config.backend {
            StorageBackend::Memory => {
                info!("Using in-memory storage");
                Ok(Self::InMemory)
            }
            StorageBackend::Postgres => {
                let url = config.resolve_url().ok_or_else(|| {
                    DomainError::configuration(
                        "storage.url or DATABASE_URL is required for the postgres backend",
                    )
                })?;

                info!("Connecting to PostgreSQL...");
                let pool = PostgresConfig::new(url)
                    .with_max_connections(config.max_connections)
                    .connect()
                    .await?;
                info!("PostgreSQL connection established");

                Ok(Self::Postgres(pool))
            }
        }
    }

    /// Storage for the collection of `E`, creating its table if needed
    pub async fn create<E>(&self) -> Result<Arc<dyn Storage<E>>, DomainError>
    where
        E: StorageEntity + 'static,
    {
        match self {
            Self::InMemory => Ok(Arc::new(InMemoryStorage::<E>::new())),
            Self::Postgres(pool) => {
                let storage = PostgresStorage::<E>::new(pool.clone());
                storage.ensure_table().await?;
                Ok(Arc::new(storage))
            }
        }
    }

    pub fn backend(&self) -> StorageBackend {
        match self {
            Self::InMemory => StorageBackend::Memory,
            Self::Postgres(_) => StorageBackend::Postgres,
        }
    }
}
