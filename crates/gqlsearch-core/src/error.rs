//! Error types for gqlsearch.

use thiserror::Error;

/// Main error type for gqlsearch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Schema decomposition failed
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Chunking failed
    #[error("chunking error: {0}")]
    Chunking(#[from] ChunkError),

    /// Embedding provider failed
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbedError),

    /// Vector store operation failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Language model provider failed
    #[error("language model error: {0}")]
    Llm(#[from] LlmError),

    /// Validator could not produce a verdict
    #[error("validator error: {0}")]
    Validation(#[from] ValidateError),

    /// Root-field search found nothing above the similarity threshold
    #[error("no relevant root fields found (minimum similarity {min_score})")]
    NoRelevantRootFields { min_score: f32 },

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Schema decomposition errors.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Chunking errors.
#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("chunking failed: {0}")]
    Failed(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Embedding errors.
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("input too long: {tokens} tokens, max {max}")]
    InputTooLong { tokens: usize, max: usize },

    #[error("tokenizer load failed: {0}")]
    TokenizerLoad(String),

    #[error("embedder not initialized")]
    NotInitialized,
}

/// Vector store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store initialization failed: {0}")]
    Init(String),

    #[error("insert failed: {0}")]
    Insert(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("delete failed: {0}")]
    Delete(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("invalid filter field: {0:?}")]
    InvalidFilter(String),
}

/// Language model errors.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected response: {0}")]
    Response(String),

    #[error("completion timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Validator errors.
#[derive(Error, Debug)]
pub enum ValidateError {
    #[error("failed to run validator: {0}")]
    Spawn(String),

    #[error("validator protocol error: {0}")]
    Protocol(String),
}

/// Result type alias for gqlsearch operations.
pub type Result<T> = std::result::Result<T, Error>;
