//! OpenAI-compatible chat completions.

use std::time::Duration;

use async_trait::async_trait;
use gqlsearch_core::{ChatMessage, CompletionOptions, LanguageModel, LlmError};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::transport_error;

/// Settings for [`OpenAiChat`].
#[derive(Debug, Clone)]
pub struct OpenAiChatOptions {
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl Default for OpenAiChatOptions {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Chat client for `/chat/completions`.
pub struct OpenAiChat {
    client: Client,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl OpenAiChat {
    pub fn new(options: OpenAiChatOptions) -> Result<Self, LlmError> {
        if options.model.trim().is_empty() {
            return Err(LlmError::Request("missing chat model name".to_string()));
        }

        let mut headers = HeaderMap::new();
        if let Some(key) = options.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            let auth = format!("Bearer {}", key.trim());
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth)
                    .map_err(|e| LlmError::Request(format!("invalid OpenAI API key: {e}")))?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(options.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| LlmError::Request(format!("failed to build OpenAI HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/chat/completions",
                options.base_url.trim_end_matches('/')
            ),
            model: options.model,
            timeout: options.timeout,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let body = build_request(&self.model, messages, options);
        debug!("Chat request to {} ({} messages)", self.model, messages.len());

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.timeout, "OpenAI chat completions"))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(LlmError::Request(format!("OpenAI returned {status}: {text}")));
        }
        let parsed: ChatResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(self.timeout)
            } else {
                LlmError::Response(format!("failed to parse OpenAI response: {e}"))
            }
        })?;
        extract_answer(parsed)
    }
}

fn build_request<'a>(
    model: &'a str,
    messages: &'a [ChatMessage],
    options: &CompletionOptions,
) -> ChatRequest<'a> {
    ChatRequest {
        model,
        temperature: options.temperature,
        max_tokens: options.max_tokens,
        messages: messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect(),
    }
}

fn extract_answer(response: ChatResponse) -> Result<String, LlmError> {
    response
        .choices
        .into_iter()
        .find_map(|choice| choice.message.content)
        .ok_or_else(|| LlmError::Response("OpenAI response missing message content".to_string()))
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_keeps_roles_in_order() {
        let messages = vec![
            ChatMessage::system("be terse"),
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
        ];
        let request = build_request("gpt-4o-mini", &messages, &CompletionOptions::default());
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["max_tokens"], 2048);
        assert_eq!(value["messages"][0], json!({"role": "system", "content": "be terse"}));
        assert_eq!(value["messages"][2]["role"], "assistant");
    }

    #[test]
    fn test_extract_answer() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "query"}}]
        }))
        .unwrap();
        assert_eq!(extract_answer(response).unwrap(), "query");
    }

    #[test]
    fn test_extract_answer_missing_content() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        }))
        .unwrap();
        assert!(matches!(extract_answer(response), Err(LlmError::Response(_))));
    }

    #[test]
    fn test_endpoint_from_base_url() {
        let chat = OpenAiChat::new(OpenAiChatOptions {
            base_url: "http://localhost:11434/v1/".to_string(),
            ..OpenAiChatOptions::default()
        })
        .unwrap();
        assert_eq!(chat.endpoint(), "http://localhost:11434/v1/chat/completions");
        assert_eq!(chat.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn test_rejects_empty_model() {
        let result = OpenAiChat::new(OpenAiChatOptions {
            model: "  ".to_string(),
            ..OpenAiChatOptions::default()
        });
        assert!(matches!(result, Err(LlmError::Request(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_request_error() {
        let chat = OpenAiChat::new(OpenAiChatOptions {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(5),
            ..OpenAiChatOptions::default()
        })
        .unwrap();
        let err = chat
            .complete(&[ChatMessage::user("hi")], &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Request(_) | LlmError::Timeout(_)));
    }
}
