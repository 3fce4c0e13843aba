//! # gqlsearch-core
//!
//! Core types and traits for gqlsearch, which turns natural-language requests
//! into GraphQL operations using semantic search over a schema's declarations.
//!
//! This crate provides the foundational abstractions used throughout gqlsearch:
//!
//! - **Schema Decomposition**: [`SchemaDecomposer`] splits SDL into declaration documents
//! - **Embedding Generation**: [`EmbeddingProvider`] converts text to vectors
//! - **Vector Storage**: [`VectorStore`] stores and searches embedded declarations
//! - **Generation**: [`LanguageModel`] and [`Validator`] drive operation synthesis
//!
//! ## Architecture
//!
//! ```text
//! SDL → SchemaDecomposer → EmbeddingProvider → VectorStore
//!                                                   ↓
//!            request text → embedding → search → pipeline → operation
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DeclarationDocument`] | One schema construct, content-addressed |
//! | [`StoredDocument`] | A declaration with its embedding |
//! | [`SearchOptions`] | Limit plus metadata/column filters |
//! | [`SearchResult`] | A matching declaration with similarity score |
//! | [`EmbedResult`] | Accounting for an ingestion run |
//!
//! ## Related Crates
//!
//! - `gqlsearch-schema`: SDL decomposer and chunker
//! - `gqlsearch-embed`: Embedding providers
//! - `gqlsearch-store`: In-memory and `LanceDB` vector stores
//! - `gqlsearch-index`: Chunking & embedding service
//! - `gqlsearch-llm`: Language model providers
//! - `gqlsearch-generate`: Operation synthesis pipeline

pub mod error;
pub mod traits;
pub mod types;

pub use error::{
    ChunkError, EmbedError, Error, LlmError, Result, SchemaError, StoreError, ValidateError,
};
pub use traits::*;
pub use types::*;
