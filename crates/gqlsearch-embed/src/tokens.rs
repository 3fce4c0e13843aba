//! Token counting for context-limited embedding models.
//!
//! Counts come from a Hugging Face `tokenizer.json`, loaded from disk or
//! downloaded into the HF cache. The character heuristic is only used when
//! a configuration asks for it.

use std::path::{Path, PathBuf};

use gqlsearch_core::EmbedError;
use hf_hub::{Repo, RepoType, api::tokio::Api};
use tokenizers::Tokenizer;
use tracing::{debug, info};

/// Where token counts come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizerSource {
    /// Local `tokenizer.json`
    File(PathBuf),
    /// Hugging Face model id; its `tokenizer.json` is fetched once and cached
    Pretrained(String),
    /// Character heuristic, see [`estimate_tokens`]
    Estimate,
}

impl TokenizerSource {
    /// Load the counter this source describes.
    pub async fn load(&self) -> Result<TokenCounter, EmbedError> {
        match self {
            Self::File(path) => TokenCounter::from_file(path),
            Self::Pretrained(model_id) => {
                info!("Fetching tokenizer for {}", model_id);
                let api = Api::new()
                    .map_err(|e| EmbedError::TokenizerLoad(format!("Failed to create HF API: {e}")))?;
                let repo = api.repo(Repo::new(model_id.clone(), RepoType::Model));
                let path = repo.get("tokenizer.json").await.map_err(|e| {
                    EmbedError::TokenizerLoad(format!(
                        "Failed to download tokenizer for {model_id}: {e}"
                    ))
                })?;
                TokenCounter::from_file(&path)
            }
            Self::Estimate => Ok(TokenCounter::Estimate),
        }
    }
}

/// A loaded token counter.
pub enum TokenCounter {
    Tokenizer(Box<Tokenizer>),
    Estimate,
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tokenizer(_) => f.write_str("TokenCounter::Tokenizer"),
            Self::Estimate => f.write_str("TokenCounter::Estimate"),
        }
    }
}

impl TokenCounter {
    /// Load a `tokenizer.json` file.
    pub fn from_file(path: &Path) -> Result<Self, EmbedError> {
        debug!("Loading tokenizer from {:?}", path);
        let tokenizer = Tokenizer::from_file(path).map_err(|e| {
            EmbedError::TokenizerLoad(format!("Failed to load {}: {e}", path.display()))
        })?;
        Ok(Self::Tokenizer(Box::new(tokenizer)))
    }

    /// Number of tokens in `text`, without special tokens.
    pub fn count(&self, text: &str) -> Result<usize, EmbedError> {
        match self {
            Self::Tokenizer(tokenizer) => tokenizer
                .encode(text, false)
                .map(|encoding| encoding.len())
                .map_err(|e| EmbedError::Inference(format!("Tokenization failed: {e}"))),
            Self::Estimate => Ok(estimate_tokens(text)),
        }
    }
}

/// Estimate the token count of `text`.
///
/// Alphanumeric runs count one token per four characters (rounded up) and
/// every punctuation character counts as its own token.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    let mut tokens = 0;
    let mut run = 0usize;
    for c in text.chars() {
        if c.is_alphanumeric() || c == '_' {
            run += 1;
        } else {
            tokens += run.div_ceil(4);
            run = 0;
            if !c.is_whitespace() {
                tokens += 1;
            }
        }
    }
    tokens + run.div_ceil(4)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Word-level tokenizer: every word and punctuation run is one token.
    pub(crate) const WORD_LEVEL_TOKENIZER: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {"[UNK]": 0, "type": 1, "Query": 2, "User": 3},
            "unk_token": "[UNK]"
        }
    }"#;

    pub(crate) fn write_tokenizer(dir: &Path) -> PathBuf {
        let path = dir.join("tokenizer.json");
        std::fs::write(&path, WORD_LEVEL_TOKENIZER).unwrap();
        path
    }

    #[tokio::test]
    async fn test_file_tokenizer_counts() {
        let temp = tempfile::tempdir().unwrap();
        let source = TokenizerSource::File(write_tokenizer(temp.path()));
        let counter = source.load().await.unwrap();

        // getUser ( id : ID !): User
        assert_eq!(counter.count("getUser(id: ID!): User").unwrap(), 7);
        assert_eq!(counter.count("").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_tokenizer_file() {
        let source = TokenizerSource::File(PathBuf::from("/nonexistent/tokenizer.json"));
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, EmbedError::TokenizerLoad(_)));
    }

    #[tokio::test]
    async fn test_estimate_source() {
        let counter = TokenizerSource::Estimate.load().await.unwrap();
        assert!(matches!(counter, TokenCounter::Estimate));
        assert_eq!(counter.count("user accounts").unwrap(), 3);
    }

    #[test]
    fn test_estimate_empty_text() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("   \n\t"), 0);
    }

    #[test]
    fn test_estimate_punctuation_counted() {
        // getUser(2) ( id(1) : ID(1) ! ) : User(1)
        assert_eq!(estimate_tokens("getUser(id: ID!): User"), 10);
    }

    #[test]
    fn test_estimate_grows_with_length() {
        let short = estimate_tokens("type Query { me: User }");
        let long = estimate_tokens(&"type Query { me: User }\n".repeat(10));
        assert_eq!(long, short * 10);
    }
}
