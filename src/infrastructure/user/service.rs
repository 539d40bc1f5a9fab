//! Account registration and login

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::storage::Storage;
use crate::domain::user::{validate_password, User, UserEmail};
use crate::domain::DomainError;

use super::password::PasswordHasher;

/// User service for registration and authentication
#[derive(Debug)]
pub struct UserService<H: PasswordHasher> {
    storage: Arc<dyn Storage<User>>,
    hasher: Arc<H>,
}

impl<H: PasswordHasher> UserService<H> {
    pub fn new(storage: Arc<dyn Storage<User>>, hasher: Arc<H>) -> Self {
        Self { storage, hasher }
    }

    /// Register a new account.
    ///
    /// The email is normalized first, so addresses differing only in case or
    /// surrounding whitespace collide.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, DomainError> {
        let email = UserEmail::new(email).map_err(|e| DomainError::validation(e.to_string()))?;
        validate_password(password).map_err(|e| DomainError::validation(e.to_string()))?;

        if self.storage.exists(&email).await? {
            return Err(DomainError::conflict("User already exists"));
        }

        let password_hash = self.hasher.hash(password)?;
        let user = User::new(email, password_hash);

        // A concurrent registration can still win the insert
        let user = self.storage.create(user).await.map_err(|e| match e {
            DomainError::Conflict { .. } => DomainError::conflict("User already exists"),
            other => other,
        })?;

        info!(email = %user.email(), "User registered");

        Ok(user)
    }

    /// Check credentials; `None` when the account is unknown or the password
    /// does not match
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, DomainError> {
        let Ok(email) = UserEmail::new(email) else {
            return Ok(None);
        };

        let Some(user) = self.storage.get(&email).await? else {
            debug!(email = %email, "Login for unknown user");
            return Ok(None);
        };

        if !self.hasher.verify(password, user.password_hash()) {
            debug!(email = %email, "Login with wrong password");
            return Ok(None);
        }

        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::storage::mock::MockStorage;
    use crate::infrastructure::storage::InMemoryStorage;
    use crate::infrastructure::user::password::Argon2Hasher;

    fn service() -> UserService<Argon2Hasher> {
        UserService::new(
            Arc::new(InMemoryStorage::<User>::new()),
            Arc::new(Argon2Hasher::with_cost(1024, 1, 1).unwrap()),
        )
    }

    #[tokio::test]
    async fn test_register_and_authenticate() {
        let service = service();

        let user = service.register("Ada@Example.com ", "hunter22").await.unwrap();
        assert_eq!(user.email().as_str(), "ada@example.com");
        assert_ne!(user.password_hash(), "hunter22");

        let found = service.authenticate("ada@example.com", "hunter22").await.unwrap();
        assert_eq!(found.unwrap().email().as_str(), "ada@example.com");

        let case_insensitive = service.authenticate("ADA@example.com", "hunter22").await.unwrap();
        assert!(case_insensitive.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let service = service();

        service.register("ada@example.com", "first").await.unwrap();
        let result = service.register("ADA@example.com", "second").await;

        match result {
            Err(DomainError::Conflict { message }) => assert_eq!(message, "User already exists"),
            other => panic!("Expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let service = service();

        assert!(matches!(
            service.register("not-an-email", "password").await,
            Err(DomainError::Validation { .. })
        ));
        assert!(matches!(
            service.register("ada@example.com", "").await,
            Err(DomainError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user() {
        let service = service();
        service.register("ada@example.com", "hunter22").await.unwrap();

        assert!(service.authenticate("ada@example.com", "hunter23").await.unwrap().is_none());
        assert!(service.authenticate("bob@example.com", "hunter22").await.unwrap().is_none());
        assert!(service.authenticate("garbage", "hunter22").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_storage_errors_propagate() {
        let service = UserService::new(
            Arc::new(MockStorage::<User>::new().with_error("database is down")),
            Arc::new(Argon2Hasher::with_cost(1024, 1, 1).unwrap()),
        );

        let result = service.authenticate("ada@example.com", "pw").await;
        assert!(matches!(result, Err(DomainError::Storage { .. })));
    }
}
