//! # gqlsearch-embed
//!
//! Embedding providers for gqlsearch.
//!
//! ## Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`OpenAiEmbedder`] | OpenAI-compatible `/embeddings` client (OpenAI, Ollama `/v1`, ...) |
//! | [`NoopEmbedder`] | Zero-vector embedder for testing |
//! | [`TokenizerSource`] | `tokenizer.json` file, Hugging Face model id, or opt-in estimate |
//! | [`TokenCounter`] | Loaded counter used when a context limit is configured |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gqlsearch_core::EmbeddingProvider;
//! use gqlsearch_embed::{OpenAiEmbedder, OpenAiEmbedderOptions};
//!
//! let embedder = OpenAiEmbedder::new(OpenAiEmbedderOptions {
//!     base_url: "http://localhost:11434/v1".into(),
//!     model: "nomic-embed-text".into(),
//!     dimensions: 768,
//!     ..Default::default()
//! })?;
//! embedder.initialize().await?;
//! let vectors = embedder.embed_batch(&["getUser(id: ID!): User"]).await?;
//! ```

pub mod noop;
pub mod openai;
pub mod tokens;

pub use noop::NoopEmbedder;
pub use openai::{DEFAULT_TOKENIZER_MODEL, OpenAiEmbedder, OpenAiEmbedderOptions};
pub use tokens::{TokenCounter, TokenizerSource, estimate_tokens};
