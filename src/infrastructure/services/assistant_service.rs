//! Assistant service - educational answers from a hosted LLM

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{DomainError, LlmProvider, LlmRequest};

/// Instructions sent with every question
pub const SYSTEM_PROMPT: &str = "You are a medical AI assistant. \
Only provide educational explanations. \
Do not provide diagnosis, treatment, or medical advice. \
Explain concepts in simple language suitable for patients. \
Do not stop mid-sentence.";

/// Answer given when the provider is missing or fails
pub const UNAVAILABLE_ANSWER: &str = "The medical assistant is currently unavailable.";

/// Answer given when the provider replies without usable text
pub const EMPTY_ANSWER: &str = "Unable to generate a response.";

const MAX_QUESTION_CHARS: usize = 4000;

/// Generation settings for the assistant
#[derive(Debug, Clone)]
pub struct AssistantSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Forwards user questions to the configured provider.
///
/// Provider failures are not surfaced to clients; they get a fixed
/// fallback answer instead.
#[derive(Debug)]
pub struct AssistantService {
    provider: Option<Arc<dyn LlmProvider>>,
    settings: AssistantSettings,
}

impl AssistantService {
    pub fn new(provider: Option<Arc<dyn LlmProvider>>, settings: AssistantSettings) -> Self {
        if provider.is_none() {
            warn!("No assistant API key configured; chat answers will use the fallback");
        }

        Self { provider, settings }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn ask(&self, user: &str, question: &str) -> Result<String, DomainError> {
        let question = question.trim();

        if question.is_empty() {
            return Err(DomainError::validation("Question cannot be empty"));
        }

        if question.chars().count() > MAX_QUESTION_CHARS {
            return Err(DomainError::validation(format!(
                "Question exceeds maximum length of {} characters",
                MAX_QUESTION_CHARS
            )));
        }

        let Some(provider) = &self.provider else {
            return Ok(UNAVAILABLE_ANSWER.to_string());
        };

        debug!(user = %user, chars = question.len(), "Forwarding question to assistant");

        let request = LlmRequest::default()
            .system(SYSTEM_PROMPT)
            .user(question)
            .temperature(self.settings.temperature)
            .max_tokens(self.settings.max_tokens);

        match provider.chat(&self.settings.model, request).await {
            Ok(response) => match response.content() {
                Some(answer) => Ok(answer.to_string()),
                None => {
                    warn!(model = %self.settings.model, "Assistant returned an empty answer");
                    Ok(EMPTY_ANSWER.to_string())
                }
            },
            Err(e) => {
                warn!(
                    provider = provider.provider_name(),
                    error = %e,
                    "Assistant request failed"
                );
                Ok(UNAVAILABLE_ANSWER.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::MockLlmProvider;
    use crate::domain::{LlmResponse, Message, MessageRole};
    use crate::infrastructure::http_client::mock::MockHttpClient;
    use crate::infrastructure::llm::OpenAiProvider;

    fn settings() -> AssistantSettings {
        AssistantSettings {
            model: "mistralai/Mistral-7B-Instruct-v0.2:together".to_string(),
            temperature: 0.4,
            max_tokens: 1000,
        }
    }

    fn reply(text: &str) -> LlmResponse {
        LlmResponse::new("id".to_string(), "m".to_string(), Message::assistant(text))
    }

    #[tokio::test]
    async fn test_answer_forwarded() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_response(reply(
            "Meningiomas arise from the meninges.",
        )));
        let service = AssistantService::new(Some(provider.clone()), settings());

        let answer = service
            .ask("ada@example.com", "  What is a meningioma? ")
            .await
            .unwrap();
        assert_eq!(answer, "Meningiomas arise from the meninges.");

        let (model, request) = provider.last_request().unwrap();
        assert_eq!(model, "mistralai/Mistral-7B-Instruct-v0.2:together");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, MessageRole::System);
        assert_eq!(request.messages[0].content, SYSTEM_PROMPT);
        assert_eq!(request.messages[1].content, "What is a meningioma?");
        assert_eq!(request.temperature, Some(0.4));
        assert_eq!(request.max_tokens, Some(1000));
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_error("HTTP 503"));
        let service = AssistantService::new(Some(provider), settings());

        let answer = service.ask("ada@example.com", "Hello?").await.unwrap();
        assert_eq!(answer, UNAVAILABLE_ANSWER);
    }

    #[tokio::test]
    async fn test_empty_reply_falls_back() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_response(reply("   ")));
        let service = AssistantService::new(Some(provider), settings());

        let answer = service.ask("ada@example.com", "Hello?").await.unwrap();
        assert_eq!(answer, EMPTY_ANSWER);
    }

    const ROUTER_URL: &str = "https://router.huggingface.co";
    const CHAT_URL: &str = "https://router.huggingface.co/v1/chat/completions";

    fn openai_service(client: MockHttpClient) -> AssistantService {
        let provider = OpenAiProvider::with_base_url(client, "hf_test", ROUTER_URL);
        AssistantService::new(Some(Arc::new(provider)), settings())
    }

    #[tokio::test]
    async fn test_reply_without_choices_is_empty_answer() {
        let client = MockHttpClient::new()
            .with_response(CHAT_URL, serde_json::json!({"id": "x", "choices": []}));
        let service = openai_service(client);

        let answer = service.ask("ada@example.com", "What is a glioma?").await.unwrap();
        assert_eq!(answer, EMPTY_ANSWER);
    }

    #[tokio::test]
    async fn test_http_error_is_unavailable_answer() {
        let client = MockHttpClient::new().with_error(CHAT_URL, "HTTP 500: upstream error");
        let service = openai_service(client);

        let answer = service.ask("ada@example.com", "What is a glioma?").await.unwrap();
        assert_eq!(answer, UNAVAILABLE_ANSWER);
    }

    #[tokio::test]
    async fn test_unconfigured_assistant() {
        let service = AssistantService::new(None, settings());

        assert!(!service.is_configured());
        assert_eq!(service.ask("a@b.io", "Hello?").await.unwrap(), UNAVAILABLE_ANSWER);
    }

    #[tokio::test]
    async fn test_question_validation() {
        let service = AssistantService::new(None, settings());

        assert!(matches!(
            service.ask("a@b.io", "   ").await,
            Err(DomainError::Validation { .. })
        ));
        assert!(matches!(
            service.ask("a@b.io", &"x".repeat(MAX_QUESTION_CHARS + 1)).await,
            Err(DomainError::Validation { .. })
        ));
    }
}
