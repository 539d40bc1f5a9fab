//! Hosted chat model used by the educational assistant

mod chat;
mod provider;

pub use chat::{FinishReason, LlmRequest, LlmResponse, Message, MessageRole, Usage};
pub use provider::LlmProvider;

#[cfg(test)]
pub use provider::mock::MockLlmProvider;
