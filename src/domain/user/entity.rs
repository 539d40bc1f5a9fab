//! User entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{normalize_email, UserValidationError};
use crate::domain::storage::{StorageEntity, StorageKey};

/// Normalized (trimmed, lowercase) email address identifying a user
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserEmail(String);

impl UserEmail {
    /// Create a new UserEmail after normalization and validation
    pub fn new(email: impl AsRef<str>) -> Result<Self, UserValidationError> {
        normalize_email(email.as_ref()).map(Self)
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserEmail {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserEmail> for String {
    fn from(email: UserEmail) -> Self {
        email.0
    }
}

impl std::fmt::Display for UserEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for UserEmail {
    fn as_str(&self) -> &str {
        &self.0
    }
}

/// Registered user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Login identifier
    email: UserEmail,
    /// Argon2 password hash in PHC string format
    password_hash: String,
    /// Registration timestamp
    created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user
    pub fn new(email: UserEmail, password_hash: impl Into<String>) -> Self {
        Self {
            email,
            password_hash: password_hash.into(),
            created_at: Utc::now(),
        }
    }

    pub fn email(&self) -> &UserEmail {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl StorageEntity for User {
    type Key = UserEmail;
    const COLLECTION: &'static str = "users";

    fn key(&self) -> &Self::Key {
        &self.email
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_email_normalized() {
        let email = UserEmail::new(" Doctor@Clinic.org").unwrap();
        assert_eq!(email.as_str(), "doctor@clinic.org");
        assert_eq!(email.to_string(), "doctor@clinic.org");
    }

    #[test]
    fn test_user_email_invalid() {
        assert!(UserEmail::new("").is_err());
        assert!(UserEmail::new("nobody").is_err());
    }

    #[test]
    fn test_user_creation() {
        let user = User::new(UserEmail::new("a@b.io").unwrap(), "hash");

        assert_eq!(user.email().as_str(), "a@b.io");
        assert_eq!(user.password_hash(), "hash");
        assert_eq!(user.key().as_str(), "a@b.io");
        assert!(user.created_at() <= Utc::now());
    }

    #[test]
    fn test_user_document_round_trip() {
        let user = User::new(UserEmail::new("a@b.io").unwrap(), "hash");
        let doc = serde_json::to_value(&user).unwrap();

        assert_eq!(doc["email"], "a@b.io");
        assert_eq!(doc["password_hash"], "hash");

        let restored: User = serde_json::from_value(doc).unwrap();
        assert_eq!(restored.email(), user.email());
    }

    #[test]
    fn test_user_document_rejects_bad_email() {
        let doc = serde_json::json!({
            "email": "broken",
            "password_hash": "hash",
            "created_at": "2024-01-01T00:00:00Z"
        });

        assert!(serde_json::from_value::<User>(doc).is_err());
    }
}
