//! Per-request state and results.

use gqlsearch_core::{DeclarationDocument, OperationType, SearchResult};
use serde::{Deserialize, Serialize};

/// Which matcher resolved the selected root field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionTier {
    Exact,
    Partial,
    #[default]
    HighestScore,
}

impl SelectionTier {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Partial => "partial",
            Self::HighestScore => "highest_score",
        }
    }
}

/// What happened along the way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Root-field candidates above the similarity threshold
    pub candidate_count: usize,
    /// Raw classification answer, `None` when the call timed out
    pub classification_answer: Option<String>,
    pub selection_tier: SelectionTier,
    pub closure_size: usize,
    /// The closure hit `max_documents` with types left to visit
    pub closure_truncated: bool,
    /// Validator errors from the final attempt
    pub last_errors: Vec<String>,
    /// Language-model calls that hit the deadline
    pub timed_out_calls: usize,
}

/// Final output of one `generate` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub operation: String,
    pub operation_type: OperationType,
    pub root_field: DeclarationDocument,
    pub validation_attempts: usize,
    pub valid: bool,
    pub diagnostics: Diagnostics,
}

/// State of one request as it moves through the stages.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    pub input: String,
    pub embedding: Vec<f32>,
    pub candidates: Vec<SearchResult>,
    pub operation_type: OperationType,
    pub root_field: Option<SearchResult>,
    pub closure: Vec<DeclarationDocument>,
    pub draft: Option<String>,
    pub attempt: usize,
    pub diagnostics: Diagnostics,
}

impl GenerationContext {
    #[must_use]
    pub fn new(input: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            input: input.into(),
            embedding,
            candidates: Vec::new(),
            operation_type: OperationType::Query,
            root_field: None,
            closure: Vec::new(),
            draft: None,
            attempt: 0,
            diagnostics: Diagnostics::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_starts_empty() {
        let ctx = GenerationContext::new("list users", vec![0.5; 3]);
        assert_eq!(ctx.input, "list users");
        assert_eq!(ctx.operation_type, OperationType::Query);
        assert!(ctx.candidates.is_empty());
        assert!(ctx.root_field.is_none());
        assert!(ctx.draft.is_none());
        assert_eq!(ctx.attempt, 0);
    }

    #[test]
    fn test_selection_tier_serializes_snake_case() {
        let value = serde_json::to_value(SelectionTier::HighestScore).unwrap();
        assert_eq!(value, "highest_score");
        assert_eq!(SelectionTier::Partial.as_str(), "partial");
    }
}
