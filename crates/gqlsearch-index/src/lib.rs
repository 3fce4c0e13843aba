//! Indexing for gqlsearch.
//!
//! This crate turns declaration documents into stored vectors:
//! token budgeting → chunking → embedding → storage.
//!
//! # Components
//!
//! - [`EmbeddingService`]: Embeds a document set in one batch and writes it to a store
//!
//! # Example
//!
//! ```rust,ignore
//! use gqlsearch_index::EmbeddingService;
//!
//! let service = EmbeddingService::new(embedder, decomposer, store);
//! let result = service.embed_and_store(&documents).await?;
//!
//! for skipped in &result.skipped_documents {
//!     eprintln!("skipped {} ({} tokens)", skipped.name, skipped.token_count);
//! }
//! ```

pub mod service;

pub use service::{EmbeddingService, SAFETY_FACTOR, safe_char_limit};
