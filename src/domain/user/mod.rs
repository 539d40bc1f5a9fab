//! User domain - registered accounts

mod entity;
mod validation;

pub use entity::{User, UserEmail};
pub use validation::{normalize_email, validate_password, UserValidationError};
