//! User validation utilities

use thiserror::Error;
use validator::ValidateEmail;

/// Errors that can occur during user validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UserValidationError {
    #[error("Email cannot be empty")]
    EmptyEmail,

    #[error("Email exceeds maximum length of {0} characters")]
    EmailTooLong(usize),

    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),

    #[error("Password cannot be empty")]
    EmptyPassword,

    #[error("Password exceeds maximum length of {0} characters")]
    PasswordTooLong(usize),
}

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Normalize and validate an email address.
///
/// Surrounding whitespace is removed and the address is lowercased so that
/// lookups are case-insensitive.
pub fn normalize_email(email: &str) -> Result<String, UserValidationError> {
    let email = email.trim().to_lowercase();

    if email.is_empty() {
        return Err(UserValidationError::EmptyEmail);
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(UserValidationError::EmailTooLong(MAX_EMAIL_LENGTH));
    }

    if !email.validate_email() {
        return Err(UserValidationError::InvalidEmail(email));
    }

    Ok(email)
}

/// Validate a password
pub fn validate_password(password: &str) -> Result<(), UserValidationError> {
    if password.is_empty() {
        return Err(UserValidationError::EmptyPassword);
    }

    if password.chars().count() > MAX_PASSWORD_LENGTH {
        return Err(UserValidationError::PasswordTooLong(MAX_PASSWORD_LENGTH));
    }

    Ok(())
}
