use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{
    DomainError, FinishReason, LlmProvider, LlmRequest, LlmResponse, Message, MessageRole, Usage,
};
use crate::infrastructure::http_client::HttpClientTrait;

const PROVIDER: &str = "openai-compatible";

/// Chat completions client for any OpenAI-compatible endpoint
/// (OpenAI itself, the Hugging Face router, local gateways)
#[derive(Debug)]
pub struct OpenAiProvider<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
}

impl<C: HttpClientTrait> OpenAiProvider<C> {
    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let auth_header = format!("Bearer {}", api_key.into());
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            auth_header,
            base_url,
        }
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request(&self, model: &str, request: &LlmRequest) -> serde_json::Value {
        let messages: Vec<OpenAiMessage> =
            request.messages.iter().map(OpenAiMessage::from_domain).collect();

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
        });

        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<LlmResponse, DomainError> {
        let response: OpenAiResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider(PROVIDER, format!("Failed to parse response: {}", e))
        })?;

        // A reply without choices carries no text; callers see empty content.
        let choice = response.choices.into_iter().next();
        let content = choice
            .as_ref()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        let mut llm_response =
            LlmResponse::new(response.id, response.model, Message::assistant(content));

        if let Some(reason) = choice.and_then(|c| c.finish_reason) {
            llm_response = llm_response.with_finish_reason(FinishReason::parse(&reason));
        }

        if let Some(usage) = response.usage {
            llm_response = llm_response.with_usage(Usage::new(
                usage.prompt_tokens,
                usage.completion_tokens,
            ));
        }

        Ok(llm_response)
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for OpenAiProvider<C> {
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        let url = self.chat_completions_url();
        let body = self.build_request(model, &request);
        let response = self.client.post_json(&url, self.headers(), &body).await?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> OpenAiMessage<'a> {
    fn from_domain(message: &'a Message) -> Self {
        let role = match message.role {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };

        Self {
            role,
            content: &message.content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    #[serde(default)]
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_client::mock::MockHttpClient;

    const BASE_URL: &str = "https://router.huggingface.co";
    const CHAT_URL: &str = "https://router.huggingface.co/v1/chat/completions";
    const MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2:together";

    #[tokio::test]
    async fn test_chat() {
        let mock_response = serde_json::json!({
            "id": "chatcmpl-123",
            "model": MODEL,
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "A glioma is a tumor that starts in glial cells."
                },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 40,
                "completion_tokens": 12,
                "total_tokens": 52
            }
        });

        let client = MockHttpClient::new().with_response(CHAT_URL, mock_response);
        let provider = OpenAiProvider::with_base_url(client, "hf_test", format!("{}/", BASE_URL));

        let request = LlmRequest::default()
            .system("Be educational.")
            .user("What is a glioma?")
            .temperature(0.4)
            .max_tokens(1000);

        let response = provider.chat(MODEL, request).await.unwrap();

        assert_eq!(response.id, "chatcmpl-123");
        assert_eq!(
            response.content(),
            Some("A glioma is a tumor that starts in glial cells.")
        );
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.usage.unwrap().total_tokens, 52);

        let body = provider.client.last_body().unwrap();
        assert_eq!(body["model"], MODEL);
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "What is a glioma?");
        assert!((body["temperature"].as_f64().unwrap() - 0.4).abs() < 1e-6);
        assert_eq!(
            provider.client.last_header("Authorization").as_deref(),
            Some("Bearer hf_test")
        );
    }

    #[tokio::test]
    async fn test_error_handling() {
        let client = MockHttpClient::new().with_error(CHAT_URL, "HTTP 401: invalid token");
        let provider = OpenAiProvider::with_base_url(client, "bad", BASE_URL);

        let request = LlmRequest::default().user("Hello!");
        assert!(provider.chat(MODEL, request).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let client = MockHttpClient::new()
            .with_response(CHAT_URL, serde_json::json!({"id": "x", "model": MODEL, "choices": []}));
        let provider = OpenAiProvider::with_base_url(client, "key", BASE_URL);

        let request = LlmRequest::default().user("Hello!");
        let response = provider.chat(MODEL, request).await.unwrap();

        assert_eq!(response.id, "x");
        assert_eq!(response.content(), None);
        assert_eq!(response.finish_reason, None);
    }

    #[tokio::test]
    async fn test_missing_choices() {
        let client = MockHttpClient::new().with_response(CHAT_URL, serde_json::json!({"id": "x"}));
        let provider = OpenAiProvider::with_base_url(client, "key", BASE_URL);

        let request = LlmRequest::default().user("Hello!");
        let response = provider.chat(MODEL, request).await.unwrap();

        assert_eq!(response.content(), None);
    }

    #[tokio::test]
    async fn test_choice_without_message() {
        let client = MockHttpClient::new()
            .with_response(CHAT_URL, serde_json::json!({"choices": [{"text": "legacy"}]}));
        let provider = OpenAiProvider::with_base_url(client, "key", BASE_URL);

        let request = LlmRequest::default().user("Hello!");
        let response = provider.chat(MODEL, request).await.unwrap();

        assert_eq!(response.content(), None);
    }

    #[tokio::test]
    async fn test_non_object_body_is_provider_error() {
        let client = MockHttpClient::new().with_response(CHAT_URL, serde_json::json!("busy"));
        let provider = OpenAiProvider::with_base_url(client, "key", BASE_URL);

        let request = LlmRequest::default().user("Hello!");
        let result = provider.chat(MODEL, request).await;

        assert!(matches!(result, Err(DomainError::Provider { .. })));
    }

    #[tokio::test]
    async fn test_null_content() {
        let client = MockHttpClient::new().with_response(
            CHAT_URL,
            serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": null}, "finish_reason": "length"}]
            }),
        );
        let provider = OpenAiProvider::with_base_url(client, "key", BASE_URL);

        let request = LlmRequest::default().user("Hello!");
        let response = provider.chat(MODEL, request).await.unwrap();

        assert_eq!(response.content(), None);
        assert_eq!(response.finish_reason, Some(FinishReason::Length));
    }
}
