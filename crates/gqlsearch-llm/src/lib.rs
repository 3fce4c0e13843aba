//! Language model providers for gqlsearch.
//!
//! Both providers implement [`LanguageModel`](gqlsearch_core::LanguageModel)
//! over async `reqwest`:
//!
//! - [`OpenAiChat`]: OpenAI-compatible `/chat/completions`
//! - [`AnthropicChat`]: Anthropic `/v1/messages`
//!
//! A request that exceeds the client timeout surfaces as
//! [`LlmError::Timeout`](gqlsearch_core::LlmError::Timeout).

pub mod anthropic;
pub mod openai;

pub use anthropic::{AnthropicChat, AnthropicChatOptions};
pub use openai::{OpenAiChat, OpenAiChatOptions};

use std::time::Duration;

use gqlsearch_core::LlmError;

/// Map a transport error, keeping timeouts distinguishable.
pub(crate) fn transport_error(err: &reqwest::Error, timeout: Duration, provider: &str) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout(timeout)
    } else {
        LlmError::Request(format!("failed to call {provider}: {err}"))
    }
}
