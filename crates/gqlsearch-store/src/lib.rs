//! Vector storage layer for gqlsearch.
//!
//! This crate provides the storage backends for declaration documents,
//! implementing the [`VectorStore`](gqlsearch_core::VectorStore) and
//! [`MetadataStore`](gqlsearch_core::MetadataStore) traits.
//!
//! # Backends
//!
//! - [`MemoryStore`]: brute-force cosine search, always available
//! - `LanceStore`: persistent `LanceDB` tables (feature `lancedb`, on by default)
//!
//! # Example
//!
//! ```rust,ignore
//! use gqlsearch_store::LanceStore;
//! use gqlsearch_core::{SearchOptions, VectorStore};
//!
//! let store = LanceStore::new("path/to/db.lance".into(), 768);
//! store.initialize().await?;
//! store.store(&documents).await?;
//! let results = store.search(&embedding, &SearchOptions::new(10)).await?;
//! ```

pub mod filter;
pub mod memory;

#[cfg(feature = "lancedb")]
pub mod lancedb;
#[cfg(feature = "lancedb")]
pub mod schema;

pub use memory::{MemoryStore, cosine_similarity};

#[cfg(feature = "lancedb")]
pub use lancedb::LanceStore;
