//! No-op embedding provider.
//!
//! [`NoopEmbedder`] returns zero-vectors for every input. It is useful for:
//! - Exercising the index and store paths without a model server
//! - Stubbing embeddings in unit tests

use async_trait::async_trait;
use gqlsearch_core::{EmbedError, EmbeddingProvider};

/// No-op embedder that returns zero-vectors.
///
/// It reports no context limit, so documents are never chunked or skipped.
///
/// # Example
///
/// ```rust
/// use gqlsearch_core::EmbeddingProvider;
/// use gqlsearch_embed::NoopEmbedder;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let embedder = NoopEmbedder::new();
/// let vectors = embedder.embed_batch(&["Hello", "World"]).await?;
///
/// assert_eq!(vectors.len(), 2);
/// assert_eq!(vectors[0].len(), 384);
/// assert!(vectors[0].iter().all(|&v| v == 0.0));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct NoopEmbedder {
    dimension: usize,
}

impl NoopEmbedder {
    /// Create a new no-op embedder with default dimension (384).
    #[must_use]
    pub fn new() -> Self {
        Self { dimension: 384 }
    }

    /// Create a new no-op embedder with custom dimension.
    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for NoopEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for NoopEmbedder {
    fn model_name(&self) -> &str {
        "noop"
    }

    fn dimensions(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|_| vec![0.0; self.dimension]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_new() {
        let embedder = NoopEmbedder::new();
        assert_eq!(embedder.dimensions(), 384);
        assert_eq!(embedder.model_name(), "noop");
        assert_eq!(embedder.max_context_size(), None);
    }

    #[test]
    fn test_noop_with_dimension() {
        let embedder = NoopEmbedder::with_dimension(768);
        assert_eq!(embedder.dimensions(), 768);
    }

    #[tokio::test]
    async fn test_noop_embed_batch() {
        let embedder = NoopEmbedder::new();
        let vectors = embedder.embed_batch(&["Hello", "World"]).await.unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), 384);
        assert!(vectors[1].iter().all(|&v| v == 0.0));
    }

    #[tokio::test]
    async fn test_noop_embed_single() {
        let embedder = NoopEmbedder::with_dimension(8);
        let vector = embedder.embed("query").await.unwrap();
        assert_eq!(vector, vec![0.0; 8]);
    }

    #[tokio::test]
    async fn test_noop_embed_empty() {
        let embedder = NoopEmbedder::new();
        let vectors = embedder.embed_batch(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }

    #[tokio::test]
    async fn test_noop_counts_no_tokens() {
        let embedder = NoopEmbedder::new();
        assert_eq!(embedder.count_tokens("anything").await.unwrap(), None);
    }
}
