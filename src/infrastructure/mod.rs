//! Infrastructure layer - External service implementations

pub mod http_client;
pub mod inference;
pub mod llm;
pub mod logging;
pub mod services;
pub mod storage;
pub mod uploads;
pub mod user;
