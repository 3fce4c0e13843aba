//! Pipeline configuration.

use std::time::Duration;

use gqlsearch_core::CompletionOptions;

/// Options for [`OperationGenerator`](crate::OperationGenerator).
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Root-field hits scoring below this are discarded
    pub min_similarity_score: f32,
    /// Upper bound on type-closure documents
    pub max_documents: usize,
    /// Draft attempts, the first draft included
    pub max_validation_retries: usize,
    /// Root-field candidates fetched from the store
    pub max_root_fields: usize,
    /// Deadline for each language-model call
    pub llm_timeout: Duration,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            min_similarity_score: 0.4,
            max_documents: 50,
            max_validation_retries: 3,
            max_root_fields: 10,
            llm_timeout: Duration::from_secs(60),
            temperature: 0.2,
            max_tokens: 2048,
        }
    }
}

impl GenerationConfig {
    /// Sampling parameters passed to every completion.
    #[must_use]
    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Attempts actually made; a zero setting still drafts once.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.max_validation_retries.max(1)
    }
}
