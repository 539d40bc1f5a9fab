//! User infrastructure: Argon2 password hashing and the account service

mod password;
mod service;

pub use password::{Argon2Hasher, PasswordHasher};
pub use service::UserService;
