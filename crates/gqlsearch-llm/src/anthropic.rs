//! Anthropic messages API.

use std::time::Duration;

use async_trait::async_trait;
use gqlsearch_core::{ChatMessage, ChatRole, CompletionOptions, LanguageModel, LlmError};
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::transport_error;

const API_VERSION: &str = "2023-06-01";

/// Settings for [`AnthropicChat`].
#[derive(Debug, Clone)]
pub struct AnthropicChatOptions {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for AnthropicChatOptions {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com".to_string(),
            api_key: String::new(),
            model: "claude-3-5-haiku-latest".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Chat client for `/v1/messages`.
///
/// System turns are joined into the request's top-level `system` field.
pub struct AnthropicChat {
    client: Client,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl AnthropicChat {
    pub fn new(options: AnthropicChatOptions) -> Result<Self, LlmError> {
        if options.api_key.trim().is_empty() {
            return Err(LlmError::Request("missing Anthropic API key".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(options.api_key.trim())
                .map_err(|e| LlmError::Request(format!("invalid Anthropic API key: {e}")))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(options.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                LlmError::Request(format!("failed to build Anthropic HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/v1/messages", options.base_url.trim_end_matches('/')),
            model: options.model,
            timeout: options.timeout,
        })
    }
}

#[async_trait]
impl LanguageModel for AnthropicChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let body = build_request(&self.model, messages, options);
        debug!("Messages request to {} ({} turns)", self.model, body.messages.len());

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.timeout, "Anthropic messages API"))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(LlmError::Request(format!(
                "Anthropic returned {status}: {text}"
            )));
        }
        let parsed: AnthropicResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(self.timeout)
            } else {
                LlmError::Response(format!("failed to parse Anthropic response: {e}"))
            }
        })?;
        extract_answer(parsed)
    }
}

fn build_request<'a>(
    model: &'a str,
    messages: &'a [ChatMessage],
    options: &CompletionOptions,
) -> AnthropicRequest<'a> {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == ChatRole::System)
        .map(|m| m.content.as_str())
        .collect();

    AnthropicRequest {
        model,
        max_tokens: options.max_tokens,
        temperature: options.temperature,
        system: (!system.is_empty()).then(|| system.join("\n\n")),
        messages: messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| AnthropicMessage {
                role: m.role.as_str(),
                content: vec![AnthropicContentBlock {
                    kind: "text",
                    text: &m.content,
                }],
            })
            .collect(),
    }
}

fn extract_answer(response: AnthropicResponse) -> Result<String, LlmError> {
    let answer = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            AnthropicResponseBlock::Text { text } => Some(text),
            AnthropicResponseBlock::Other => None,
        })
        .collect::<Vec<_>>()
        .join("\n");
    if answer.is_empty() {
        return Err(LlmError::Response(
            "Anthropic response missing text content".to_string(),
        ));
    }
    Ok(answer)
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: Vec<AnthropicContentBlock<'a>>,
}

#[derive(Serialize)]
struct AnthropicContentBlock<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_system_turns_move_to_top_level() {
        let messages = vec![
            ChatMessage::system("rule one"),
            ChatMessage::system("rule two"),
            ChatMessage::user("write a query"),
        ];
        let request = build_request("claude", &messages, &CompletionOptions::default());
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["system"], "rule one\n\nrule two");
        assert_eq!(value["messages"].as_array().unwrap().len(), 1);
        assert_eq!(
            value["messages"][0],
            json!({"role": "user", "content": [{"type": "text", "text": "write a query"}]})
        );
    }

    #[test]
    fn test_no_system_field_without_system_turns() {
        let messages = vec![ChatMessage::user("hi")];
        let request = build_request("claude", &messages, &CompletionOptions::default());
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("system").is_none());
    }

    #[test]
    fn test_extract_answer_joins_text_blocks() {
        let response: AnthropicResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "first"},
                {"type": "tool_use", "id": "x", "name": "y", "input": {}},
                {"type": "text", "text": "second"}
            ]
        }))
        .unwrap();
        assert_eq!(extract_answer(response).unwrap(), "first\nsecond");
    }

    #[test]
    fn test_extract_answer_requires_text() {
        let response: AnthropicResponse =
            serde_json::from_value(json!({"content": []})).unwrap();
        assert!(matches!(extract_answer(response), Err(LlmError::Response(_))));
    }

    #[test]
    fn test_requires_api_key() {
        let result = AnthropicChat::new(AnthropicChatOptions::default());
        assert!(matches!(result, Err(LlmError::Request(_))));
    }
}
