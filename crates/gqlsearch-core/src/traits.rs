//! Core traits for gqlsearch components.
//!
//! This module defines the trait interfaces that all gqlsearch components implement:
//!
//! - [`SchemaDecomposer`]: Turn SDL into declaration documents and split oversized ones
//! - [`EmbeddingProvider`]: Generate vector embeddings
//! - [`VectorStore`]: Store and search embedded declarations
//! - [`MetadataStore`]: Out-of-band key/value side channel of a store
//! - [`LanguageModel`]: Complete a role-tagged conversation
//! - [`Validator`]: Judge a generated operation against the schema
//!
//! Backends are selected at configuration time; callers hold `Arc<dyn Trait>`.

use async_trait::async_trait;

use crate::error::{
    ChunkError, EmbedError, LlmError, SchemaError, StoreError, ValidateError,
};
use crate::types::{
    ChatMessage, CompletionOptions, DeclarationDocument, SearchOptions, SearchResult,
    StoredDocument, ValidationOutcome,
};

// ============================================================================
// Schema Decomposition
// ============================================================================

/// Turns a schema document into declaration records.
pub trait SchemaDecomposer: Send + Sync {
    /// Parse SDL into a flat list of declaration documents.
    fn parse(&self, schema: &str) -> Result<Vec<DeclarationDocument>, SchemaError>;

    /// Split documents whose content exceeds `char_limit` characters.
    ///
    /// Documents at or under the limit are returned unchanged. Chunk contents
    /// concatenate back to the original content.
    fn chunk(
        &self,
        documents: &[DeclarationDocument],
        char_limit: usize,
    ) -> Result<Vec<DeclarationDocument>, ChunkError>;
}

// ============================================================================
// Embedding
// ============================================================================

/// Trait for generating embeddings.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model name/identifier.
    fn model_name(&self) -> &str;

    /// Embedding dimension.
    fn dimensions(&self) -> usize;

    /// Maximum tokens per input, if the provider knows it.
    fn max_context_size(&self) -> Option<usize> {
        None
    }

    /// Prepare the provider (load models, probe endpoints).
    async fn initialize(&self) -> Result<(), EmbedError> {
        Ok(())
    }

    /// Count tokens for a text; `None` when the provider cannot.
    async fn count_tokens(&self, _text: &str) -> Result<Option<usize>, EmbedError> {
        Ok(None)
    }

    /// Embed many texts in one physical call.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::Inference("empty embedding result".to_string()))
    }

    /// Release provider resources.
    async fn dispose(&self) -> Result<(), EmbedError> {
        Ok(())
    }
}

// ============================================================================
// Vector Storage
// ============================================================================

/// Trait for vector storage and search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Initialize the store.
    async fn initialize(&self) -> Result<(), StoreError>;

    /// Release store resources.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Upsert documents by id; last write wins.
    async fn store(&self, documents: &[StoredDocument]) -> Result<(), StoreError>;

    /// Similarity search, results by descending score.
    async fn search(
        &self,
        embedding: &[f32],
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>, StoreError>;

    /// Delete documents by id, returning how many existed.
    async fn delete(&self, ids: &[String]) -> Result<u64, StoreError>;

    /// Remove every document.
    async fn clear(&self) -> Result<(), StoreError>;

    /// Number of stored documents.
    async fn count(&self) -> Result<u64, StoreError>;
}

/// Out-of-band key/value metadata kept beside the documents.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get_metadata(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set_metadata(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

// ============================================================================
// Language Models
// ============================================================================

/// Trait for chat-style language model backends.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model name/identifier.
    fn model_name(&self) -> &str;

    /// Complete a conversation, returning the assistant text.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, LlmError>;
}

// ============================================================================
// Validation
// ============================================================================

/// Trait for operation validators.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Validate `operation` against `schema`.
    ///
    /// An invalid operation is `Ok` with `valid == false`; `Err` means no
    /// verdict could be produced.
    async fn validate(
        &self,
        schema: &str,
        operation: &str,
    ) -> Result<ValidationOutcome, ValidateError>;
}
