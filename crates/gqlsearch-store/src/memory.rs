//! In-memory store for testing without `LanceDB`.
//!
//! This module provides a [`MemoryStore`] that keeps declaration documents in
//! memory. It's useful for:
//! - Testing without the `LanceDB` dependency
//! - Small schemas where persistence is not needed
//! - Unit tests that don't need persistence

use std::collections::HashMap;

use async_trait::async_trait;
use gqlsearch_core::{
    MetadataStore, SearchOptions, SearchResult, StoreError, StoredDocument, VectorStore,
};
use tokio::sync::RwLock;
use tracing::debug;

use crate::filter;

/// Documents in insertion order plus an id index.
#[derive(Default)]
struct Documents {
    entries: Vec<StoredDocument>,
    index: HashMap<String, usize>,
}

impl Documents {
    fn upsert(&mut self, document: StoredDocument) {
        if let Some(&i) = self.index.get(document.id()) {
            self.entries[i] = document;
        } else {
            self.index.insert(document.id().to_string(), self.entries.len());
            self.entries.push(document);
        }
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id().to_string(), i))
            .collect();
    }
}

/// In-memory vector store.
///
/// Search is brute-force cosine similarity. Results with equal scores keep
/// insertion order; replacing a document keeps its original position.
///
/// # Example
///
/// ```rust
/// use gqlsearch_core::VectorStore;
/// use gqlsearch_store::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new(384);
/// store.initialize().await?;
/// assert_eq!(store.count().await?, 0);
/// # Ok(())
/// # }
/// ```
pub struct MemoryStore {
    dimension: usize,
    documents: RwLock<Documents>,
    metadata: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create a new in-memory store with the given embedding dimension.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            documents: RwLock::new(Documents::default()),
            metadata: RwLock::new(HashMap::new()),
        }
    }

    /// Embedding dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Snapshot of all stored documents in insertion order.
    pub async fn all(&self) -> Vec<StoredDocument> {
        self.documents.read().await.entries.clone()
    }

    fn check_dimension(&self, len: usize) -> Result<(), StoreError> {
        if len == self.dimension {
            Ok(())
        } else {
            Err(StoreError::Dimension {
                expected: self.dimension,
                actual: len,
            })
        }
    }
}

/// Cosine similarity between two vectors; zero when either has no magnitude.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        debug!("MemoryStore initialized (dimension: {})", self.dimension);
        Ok(())
    }

    async fn store(&self, documents: &[StoredDocument]) -> Result<(), StoreError> {
        for document in documents {
            self.check_dimension(document.embedding.len())?;
        }

        let mut store = self.documents.write().await;
        for document in documents {
            store.upsert(document.clone());
        }
        debug!("Stored {} documents", documents.len());
        Ok(())
    }

    async fn search(
        &self,
        embedding: &[f32],
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>, StoreError> {
        self.check_dimension(embedding.len())?;
        filter::validate_options(options)?;

        let store = self.documents.read().await;
        let mut results: Vec<(f32, &StoredDocument)> = store
            .entries
            .iter()
            .filter(|d| filter::matches(&d.document, options))
            .map(|d| (cosine_similarity(embedding, &d.embedding), d))
            .collect();

        // Stable sort keeps insertion order on ties
        results.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(results
            .into_iter()
            .take(options.limit)
            .map(|(score, d)| SearchResult {
                document: d.document.clone(),
                score,
            })
            .collect())
    }

    async fn delete(&self, ids: &[String]) -> Result<u64, StoreError> {
        let mut store = self.documents.write().await;
        let before = store.entries.len();
        store.entries.retain(|d| !ids.iter().any(|id| id == d.id()));
        store.reindex();
        let deleted = (before - store.entries.len()) as u64;
        debug!("Deleted {} documents", deleted);
        Ok(deleted)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut store = self.documents.write().await;
        *store = Documents::default();
        debug!("Cleared MemoryStore");
        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.documents.read().await.entries.len() as u64)
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn get_metadata(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.metadata.read().await.get(key).cloned())
    }

    async fn set_metadata(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.metadata
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
