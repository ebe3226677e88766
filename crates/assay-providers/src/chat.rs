//! OpenAI-compatible chat completions (DeepSeek by default).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use assay_core::{CompletionConfig, CompletionProvider, Error, Prompt, ProviderFault};

use crate::transport_fault;

pub struct ChatCompletionsProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ChatCompletionsProvider {
    /// Fails with a configuration error before any request when the credential is missing.
    pub fn new(config: &CompletionConfig) -> Result<Self, Error> {
        let api_key = config.require_api_key()?.to_string();
        let client = Client::builder()
            .user_agent(concat!("assay/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn build_request<'a>(&'a self, prompt: &'a Prompt) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            stream: false,
        }
    }

    fn parse_response(&self, body: &str) -> Result<String, ProviderFault> {
        let response: ChatResponse =
            serde_json::from_str(body).map_err(|e| ProviderFault::malformed(e.to_string()))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderFault::malformed("No choices in response"))?;

        if choice.finish_reason.as_deref() == Some("length") {
            warn!("Completion was truncated at the token limit");
        }
        if let Some(usage) = response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion usage"
            );
        }

        match choice.message.content {
            Some(content) if !content.is_empty() => Ok(content),
            _ => Err(ProviderFault::malformed("Response message has no content")),
        }
    }

    fn parse_error(&self, status: u16, body: &str) -> ProviderFault {
        #[derive(Deserialize)]
        struct ErrorResponse {
            error: ErrorDetail,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            message: String,
        }

        let message = serde_json::from_str::<ErrorResponse>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.to_string());
        ProviderFault::from_status(status, message)
    }
}

#[async_trait]
impl CompletionProvider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        "chat-completions"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, ProviderFault> {
        let api_request = self.build_request(prompt);
        debug!(model = %self.model, base_url = %self.base_url, "Chat completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(transport_fault)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_fault)?;
        if !status.is_success() {
            return Err(self.parse_error(status.as_u16(), &body));
        }

        self.parse_response(&body)
    }
}

// Chat completions API types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> ChatCompletionsProvider {
        ChatCompletionsProvider::new(&CompletionConfig::default().with_api_key("sk-test")).unwrap()
    }

    fn prompt() -> Prompt {
        Prompt {
            system: "你是一个专业、犀利、数据驱动的商业分析师。".to_string(),
            user: "评估：鲜花店".to_string(),
        }
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let err = ChatCompletionsProvider::new(&CompletionConfig::default()).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("DEEPSEEK_API_KEY"));
    }

    #[test]
    fn test_provider_creation() {
        let provider = provider();
        assert_eq!(provider.model(), "deepseek-chat");
        assert_eq!(provider.base_url, "https://api.deepseek.com");

        let custom = CompletionConfig {
            model: "deepseek-reasoner".to_string(),
            ..CompletionConfig::default().with_api_key("sk")
        };
        assert_eq!(ChatCompletionsProvider::new(&custom).unwrap().model(), "deepseek-reasoner");
    }

    #[test]
    fn test_build_request() {
        let provider = provider();
        let prompt = prompt();
        let body = serde_json::to_value(provider.build_request(&prompt)).unwrap();

        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], prompt.system);
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "评估：鲜花店");
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_response() {
        let body = r###"{
            "id": "x",
            "model": "deepseek-chat",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "## 📊 市场红蓝海\n**红海**"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30}
        }"###;
        assert_eq!(provider().parse_response(body).unwrap(), "## 📊 市场红蓝海\n**红海**");
    }

    #[test]
    fn test_parse_response_without_choices() {
        let fault = provider().parse_response(r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(fault, ProviderFault::Malformed(_)));

        let fault = provider()
            .parse_response(r#"{"choices": [{"message": {"content": null}}]}"#)
            .unwrap_err();
        assert!(matches!(fault, ProviderFault::Malformed(_)));
    }

    #[test]
    fn test_parse_error() {
        let provider = provider();
        let body = r#"{"error": {"message": "Authentication Fails (no such user)", "type": "authentication_error"}}"#;
        assert_eq!(
            provider.parse_error(401, body),
            ProviderFault::Auth("Authentication Fails (no such user)".to_string())
        );
        assert!(matches!(
            provider.parse_error(429, r#"{"error": {"message": "Rate limit reached"}}"#),
            ProviderFault::RateLimit(_)
        ));
        assert_eq!(
            provider.parse_error(402, r#"{"error": {"message": "Insufficient Balance"}}"#),
            ProviderFault::api(402, "Insufficient Balance")
        );
        assert_eq!(provider.parse_error(503, "busy"), ProviderFault::api(503, "busy"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_fault() {
        let config = CompletionConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 5,
            ..CompletionConfig::default().with_api_key("sk-test")
        };
        let provider = ChatCompletionsProvider::new(&config).unwrap();
        let fault = provider.complete(&prompt()).await.unwrap_err();
        assert!(matches!(fault, ProviderFault::Network(_) | ProviderFault::Timeout(_)));
    }
}
