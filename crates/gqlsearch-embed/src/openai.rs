//! Embedding provider for OpenAI-compatible `/embeddings` endpoints.
//!
//! Works against OpenAI itself and against local servers exposing the same
//! API, such as Ollama's `/v1` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use gqlsearch_core::{EmbedError, EmbeddingProvider};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::tokens::{TokenCounter, TokenizerSource};

/// Tokenizer matching OpenAI's `cl100k_base` embedding models.
pub const DEFAULT_TOKENIZER_MODEL: &str = "Xenova/text-embedding-ada-002";

/// Settings for [`OpenAiEmbedder`].
#[derive(Debug, Clone)]
pub struct OpenAiEmbedderOptions {
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    /// Bearer token; local servers usually need none
    pub api_key: Option<String>,
    pub model: String,
    /// Expected vector length
    pub dimensions: usize,
    /// Send `dimensions` in the request (models that support shortening)
    pub request_dimensions: bool,
    /// Maximum tokens per input; enables token counting when set
    pub max_context_tokens: Option<usize>,
    /// Token counter used with `max_context_tokens`
    pub tokenizer: Option<TokenizerSource>,
    pub timeout: Duration,
    pub max_retries: usize,
    /// Inputs per HTTP request
    pub batch_size: usize,
}

impl Default for OpenAiEmbedderOptions {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            request_dimensions: false,
            max_context_tokens: Some(8191),
            tokenizer: Some(TokenizerSource::Pretrained(
                DEFAULT_TOKENIZER_MODEL.to_string(),
            )),
            timeout: Duration::from_secs(60),
            max_retries: 3,
            batch_size: 256,
        }
    }
}

/// Async embeddings client for OpenAI-compatible endpoints.
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    options: OpenAiEmbedderOptions,
    counter: RwLock<Option<TokenCounter>>,
}

impl OpenAiEmbedder {
    /// Build a client from options.
    pub fn new(options: OpenAiEmbedderOptions) -> Result<Self, EmbedError> {
        if options.model.trim().is_empty() {
            return Err(EmbedError::Request("missing embedding model name".to_string()));
        }
        if options.dimensions == 0 {
            return Err(EmbedError::Request(
                "embedding dimensions must be positive".to_string(),
            ));
        }
        if options.max_context_tokens.is_some() && options.tokenizer.is_none() {
            return Err(EmbedError::TokenizerLoad(
                "max_context_tokens needs a tokenizer (or opt into estimation)".to_string(),
            ));
        }
        let counter = matches!(options.tokenizer, Some(TokenizerSource::Estimate))
            .then_some(TokenCounter::Estimate);

        let mut headers = HeaderMap::new();
        if let Some(key) = options.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            let auth = format!("Bearer {}", key.trim());
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth)
                    .map_err(|e| EmbedError::Request(format!("invalid API key: {e}")))?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(options.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| EmbedError::Request(format!("failed to build HTTP client: {e}")))?;
        let endpoint = format!("{}/embeddings", options.base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            endpoint,
            options,
            counter: RwLock::new(counter),
        })
    }

    /// Load the configured tokenizer if a context limit is set.
    ///
    /// Called by `initialize`; repeated calls keep the loaded counter.
    pub async fn load_tokenizer(&self) -> Result<(), EmbedError> {
        if self.options.max_context_tokens.is_none() || self.counter.read().await.is_some() {
            return Ok(());
        }
        let Some(source) = &self.options.tokenizer else {
            return Ok(());
        };
        let counter = source.load().await?;
        debug!("Token counter ready: {:?}", counter);
        *self.counter.write().await = Some(counter);
        Ok(())
    }

    /// Endpoint this client posts to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let request = EmbeddingRequest {
            model: &self.options.model,
            input: inputs,
            dimensions: self
                .options
                .request_dimensions
                .then_some(self.options.dimensions),
        };

        let mut attempt = 0usize;
        loop {
            match self.client.post(&self.endpoint).json(&request).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let mut parsed: EmbeddingResponse = resp.json().await.map_err(|e| {
                            EmbedError::Inference(format!("failed to parse response: {e}"))
                        })?;
                        parsed.data.sort_by_key(|entry| entry.index);
                        return Ok(parsed.data.into_iter().map(|e| e.embedding).collect());
                    }

                    let body = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && attempt + 1 < self.options.max_retries {
                        attempt += 1;
                        warn!("Embedding request returned {}, retrying ({})", status, attempt);
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(EmbedError::Request(format!(
                        "embeddings request failed ({status}): {body}"
                    )));
                }
                Err(err) => {
                    if is_retryable(&err) && attempt + 1 < self.options.max_retries {
                        attempt += 1;
                        warn!("Embedding request error: {}, retrying ({})", err, attempt);
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(EmbedError::Request(err.to_string()));
                }
            }
        }
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = u32::try_from(attempt.min(5)).unwrap_or(5);
    Duration::from_millis(500 * (1 << capped))
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.options.model
    }

    fn dimensions(&self) -> usize {
        self.options.dimensions
    }

    fn max_context_size(&self) -> Option<usize> {
        self.options.max_context_tokens
    }

    async fn initialize(&self) -> Result<(), EmbedError> {
        self.load_tokenizer().await?;
        let probe = self.request_batch(&["ping"]).await?;
        let actual = probe.first().map_or(0, Vec::len);
        if actual != self.options.dimensions {
            return Err(EmbedError::Inference(format!(
                "model {} returned {} dimensions, configured {}",
                self.options.model, actual, self.options.dimensions
            )));
        }
        info!(
            "Embedding provider ready: {} ({} dims)",
            self.options.model, actual
        );
        Ok(())
    }

    async fn count_tokens(&self, text: &str) -> Result<Option<usize>, EmbedError> {
        if self.options.max_context_tokens.is_none() {
            return Ok(None);
        }
        let counter = self.counter.read().await;
        let counter = counter.as_ref().ok_or(EmbedError::NotInitialized)?;
        counter.count(text).map(Some)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.options.batch_size.max(1)) {
            debug!("Embedding batch of {} texts", batch.len());
            let vectors = self.request_batch(batch).await?;
            if vectors.len() != batch.len() {
                return Err(EmbedError::Inference(format!(
                    "provider returned {} embeddings for {} inputs",
                    vectors.len(),
                    batch.len()
                )));
            }
            if let Some(bad) = vectors
                .iter()
                .find(|v| v.len() != self.options.dimensions)
            {
                return Err(EmbedError::Inference(format!(
                    "provider returned a {}-dimensional vector, expected {}",
                    bad.len(),
                    self.options.dimensions
                )));
            }
            embeddings.extend(vectors);
        }
        Ok(embeddings)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
