//! HTTP API layer

pub mod assistant;
pub mod auth;
pub mod health;
pub mod predictions;
pub mod router;
pub mod state;
pub mod types;

pub use router::create_router;
pub use state::{AppState, UserServiceTrait};
