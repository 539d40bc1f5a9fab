//! Storage trait definition

use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::DomainError;

use super::entity::StorageEntity;

/// Document store for one collection of entities
#[async_trait]
pub trait Storage<E>: Send + Sync + Debug
where
    E: StorageEntity + 'static,
{
    /// Retrieves an entity by its key
    async fn get(&self, key: &E::Key) -> Result<Option<E>, DomainError>;

    /// Retrieves all entities
    async fn list(&self) -> Result<Vec<E>, DomainError>;

    /// Retrieves entities whose top-level string `field` equals `value`
    async fn find_by(&self, field: &str, value: &str) -> Result<Vec<E>, DomainError>;

    /// Inserts a new entity, returns a conflict error if the key is taken
    async fn create(&self, entity: E) -> Result<E, DomainError>;

    /// Checks if an entity exists by its key
    async fn exists(&self, key: &E::Key) -> Result<bool, DomainError> {
        Ok(self.get(key).await?.is_some())
    }

    /// Returns the number of entities
    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.list().await?.len())
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::domain::storage::entity::{field_matches, StorageKey};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock storage for testing
    #[derive(Debug)]
    pub struct MockStorage<E>
    where
        E: StorageEntity,
    {
        entities: Mutex<HashMap<String, E>>,
        error: Mutex<Option<String>>,
    }

    impl<E> Default for MockStorage<E>
    where
        E: StorageEntity,
    {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<E> MockStorage<E>
    where
        E: StorageEntity,
    {
        pub fn new() -> Self {
            Self {
                entities: Mutex::new(HashMap::new()),
                error: Mutex::new(None),
            }
        }

        pub fn with_entity(self, entity: E) -> Self {
            self.entities
                .lock()
                .unwrap()
                .insert(entity.key().as_str().to_string(), entity);
            self
        }

        pub fn with_error(self, error: impl Into<String>) -> Self {
            *self.error.lock().unwrap() = Some(error.into());
            self
        }

        fn check_error(&self) -> Result<(), DomainError> {
            if let Some(error) = self.error.lock().unwrap().clone() {
                return Err(DomainError::storage(error));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl<E> Storage<E> for MockStorage<E>
    where
        E: StorageEntity + 'static,
    {
        async fn get(&self, key: &E::Key) -> Result<Option<E>, DomainError> {
            self.check_error()?;
            Ok(self.entities.lock().unwrap().get(key.as_str()).cloned())
        }

        async fn list(&self) -> Result<Vec<E>, DomainError> {
            self.check_error()?;
            Ok(self.entities.lock().unwrap().values().cloned().collect())
        }

        async fn find_by(&self, field: &str, value: &str) -> Result<Vec<E>, DomainError> {
            self.check_error()?;
            Ok(self
                .entities
                .lock()
                .unwrap()
                .values()
                .filter(|e| field_matches(*e, field, value))
                .cloned()
                .collect())
        }

        async fn create(&self, entity: E) -> Result<E, DomainError> {
            self.check_error()?;
            let key = entity.key().as_str().to_string();
            let mut entities = self.entities.lock().unwrap();

            if entities.contains_key(&key) {
                return Err(DomainError::conflict(format!(
                    "Entity with key '{}' already exists",
                    key
                )));
            }

            entities.insert(key, entity.clone());
            Ok(entity)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use serde::{Deserialize, Serialize};

        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        struct ScanKey(String);

        impl StorageKey for ScanKey {
            fn as_str(&self) -> &str {
                &self.0
            }
        }

        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        struct Scan {
            id: ScanKey,
            user: String,
        }

        impl StorageEntity for Scan {
            type Key = ScanKey;
            const COLLECTION: &'static str = "scans";

            fn key(&self) -> &Self::Key {
                &self.id
            }
        }

        fn scan(id: &str, user: &str) -> Scan {
            Scan {
                id: ScanKey(id.to_string()),
                user: user.to_string(),
            }
        }

        #[tokio::test]
        async fn test_mock_storage_create_conflict() {
            let storage = MockStorage::new().with_entity(scan("1", "a"));

            let result = storage.create(scan("1", "b")).await;
            assert!(matches!(result, Err(DomainError::Conflict { .. })));
        }

        #[tokio::test]
        async fn test_mock_storage_find_by() {
            let storage = MockStorage::new()
                .with_entity(scan("1", "a"))
                .with_entity(scan("2", "b"))
                .with_entity(scan("3", "a"));

            let found = storage.find_by("user", "a").await.unwrap();
            assert_eq!(found.len(), 2);
            assert!(found.iter().all(|s| s.user == "a"));
            assert_eq!(storage.count().await.unwrap(), 3);
        }

        #[tokio::test]
        async fn test_mock_storage_exists() {
            let storage = MockStorage::new().with_entity(scan("1", "a"));

            assert!(storage.exists(&ScanKey("1".to_string())).await.unwrap());
            assert!(!storage.exists(&ScanKey("2".to_string())).await.unwrap());
        }

        #[tokio::test]
        async fn test_mock_storage_with_error() {
            let storage: MockStorage<Scan> = MockStorage::new().with_error("Simulated storage error");

            assert!(storage.list().await.is_err());
            assert!(storage.find_by("user", "a").await.is_err());
        }
    }
}
