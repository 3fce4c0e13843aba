//! Chunking and embedding service.

use std::sync::Arc;

use gqlsearch_core::{
    ChunkedDocument, DeclarationDocument, EmbedError, EmbedResult, EmbeddingProvider, Result,
    SchemaDecomposer, SkippedDocument, StoredDocument, VectorStore,
};
use tracing::{debug, info, warn};

/// Fraction of the estimated character budget actually used when splitting.
pub const SAFETY_FACTOR: f64 = 0.9;

/// Outcome of budgeting one document.
enum Plan {
    /// Embed the document as is.
    Whole,
    /// Embed these chunks in place of the document.
    Chunked {
        chunks: Vec<DeclarationDocument>,
        token_count: usize,
    },
    /// Drop the document.
    Skip { token_count: usize, limit: usize },
}

/// Embeds declaration documents and writes them to a vector store.
///
/// Documents over the provider's context window are split with the
/// decomposer's chunker; documents that cannot be brought under the window
/// are dropped and reported in the [`EmbedResult`].
pub struct EmbeddingService {
    /// Embedding provider
    embedder: Arc<dyn EmbeddingProvider>,
    /// Chunker source
    decomposer: Arc<dyn SchemaDecomposer>,
    /// Destination store
    store: Arc<dyn VectorStore>,
}

impl EmbeddingService {
    /// Create a new embedding service.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        decomposer: Arc<dyn SchemaDecomposer>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            embedder,
            decomposer,
            store,
        }
    }

    /// Get the embedding provider.
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Get the destination store.
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Embed `documents` in a single batch and store them in a single write.
    ///
    /// Every input document is counted exactly once, either as embedded or
    /// as skipped. A chunked document counts once towards `embedded_count`
    /// while each of its chunks is a separate stored record.
    pub async fn embed_and_store(&self, documents: &[DeclarationDocument]) -> Result<EmbedResult> {
        let mut result = EmbedResult::default();
        let mut units: Vec<DeclarationDocument> = Vec::with_capacity(documents.len());

        for document in documents {
            match self.plan(document).await? {
                Plan::Whole => {
                    result.embedded_count += 1;
                    units.push(document.clone());
                }
                Plan::Chunked {
                    chunks,
                    token_count,
                } => {
                    debug!(
                        "Chunked {} into {} pieces ({} tokens)",
                        document.id,
                        chunks.len(),
                        token_count
                    );
                    result.chunked_documents.push(ChunkedDocument {
                        id: document.id.clone(),
                        name: document.name.clone(),
                        token_count,
                        chunk_count: chunks.len(),
                    });
                    result.embedded_count += 1;
                    units.extend(chunks);
                }
                Plan::Skip { token_count, limit } => {
                    warn!(
                        "Skipping {} ({}): {} tokens exceeds limit {}",
                        document.name, document.id, token_count, limit
                    );
                    result.skipped_documents.push(SkippedDocument {
                        id: document.id.clone(),
                        name: document.name.clone(),
                        token_count,
                        limit,
                    });
                }
            }
        }

        result.skipped_count = result.skipped_documents.len();
        result.chunked_count = result.chunked_documents.len();

        if units.is_empty() {
            info!(
                "Nothing to embed ({} documents skipped)",
                result.skipped_count
            );
            return Ok(result);
        }

        let texts: Vec<&str> = units.iter().map(|u| u.content.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != units.len() {
            return Err(EmbedError::Inference(format!(
                "provider returned {} vectors for {} inputs",
                embeddings.len(),
                units.len()
            ))
            .into());
        }

        let stored: Vec<StoredDocument> = units
            .into_iter()
            .zip(embeddings)
            .map(|(document, embedding)| StoredDocument::new(document, embedding))
            .collect();

        self.store.store(&stored).await?;
        result.stored_count = stored.len();

        info!(
            "Embedded {} documents ({} chunked, {} skipped, {} records stored)",
            result.embedded_count, result.chunked_count, result.skipped_count, result.stored_count
        );
        Ok(result)
    }

    /// Decide how one document is embedded.
    async fn plan(&self, document: &DeclarationDocument) -> Result<Plan> {
        let Some(limit) = self.embedder.max_context_size() else {
            return Ok(Plan::Whole);
        };
        let Some(token_count) = self.embedder.count_tokens(&document.content).await? else {
            return Ok(Plan::Whole);
        };
        if token_count <= limit {
            return Ok(Plan::Whole);
        }

        let skip = Plan::Skip { token_count, limit };
        let char_limit = safe_char_limit(document.content.chars().count(), token_count, limit);
        if char_limit == 0 {
            return Ok(skip);
        }

        let chunks = match self
            .decomposer
            .chunk(std::slice::from_ref(document), char_limit)
        {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!("Chunking {} failed: {}", document.id, e);
                return Ok(skip);
            }
        };
        if chunks.len() <= 1 {
            return Ok(skip);
        }

        for chunk in &chunks {
            let chunk_tokens = self.embedder.count_tokens(&chunk.content).await?;
            if chunk_tokens.is_some_and(|t| t > limit) {
                debug!("Chunk {} still over budget", chunk.id);
                return Ok(skip);
            }
        }

        Ok(Plan::Chunked {
            chunks,
            token_count,
        })
    }
}

/// Characters that should fit in `limit` tokens, from the text's own ratio.
#[must_use]
pub fn safe_char_limit(chars: usize, tokens: usize, limit: usize) -> usize {
    if tokens == 0 {
        return chars;
    }
    let ratio = chars as f64 / tokens as f64;
    (ratio * limit as f64 * SAFETY_FACTOR).floor() as usize
}
