//! Configuration for gqlsearch.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use gqlsearch_embed::{DEFAULT_TOKENIZER_MODEL, TokenizerSource};
use gqlsearch_generate::GenerationConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Embedding provider
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chat model used by the generation pipeline
    #[serde(default)]
    pub llm: LlmConfig,

    /// Vector store backend
    #[serde(default)]
    pub store: StoreConfig,

    /// Pipeline thresholds and limits
    #[serde(default)]
    pub generation: GenerationSettings,

    /// Operation validator
    #[serde(default)]
    pub validator: ValidatorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ============================================================================
// Embedding
// ============================================================================

/// Embedding provider selection, tagged by `provider`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum EmbeddingConfig {
    #[serde(rename = "openai")]
    OpenAi(OpenAiEmbeddingConfig),
    /// Zero vectors; indexing works, similarity does not
    Noop {
        #[serde(default = "default_noop_dimensions")]
        dimensions: usize,
    },
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::OpenAi(OpenAiEmbeddingConfig::default())
    }
}

impl EmbeddingConfig {
    /// Vector length the store is created with.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        match self {
            Self::OpenAi(openai) => openai.dimensions,
            Self::Noop { dimensions } => *dimensions,
        }
    }
}

fn default_noop_dimensions() -> usize {
    384
}

/// OpenAI-compatible `/embeddings` endpoint (OpenAI, Ollama `/v1`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiEmbeddingConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,

    /// Send `dimensions` with each request
    #[serde(default)]
    pub request_dimensions: bool,

    /// Environment variable holding the API key
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: Option<String>,

    /// Token limit per input; unset disables chunking
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: Option<usize>,

    /// Hugging Face model id whose `tokenizer.json` counts tokens
    #[serde(default = "default_tokenizer")]
    pub tokenizer: Option<String>,

    /// Local `tokenizer.json`; takes precedence over `tokenizer`
    #[serde(default)]
    pub tokenizer_path: Option<PathBuf>,

    /// Count tokens with the character heuristic instead of a tokenizer
    #[serde(default)]
    pub estimate_tokens: bool,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimensions() -> usize {
    1536
}

#[allow(clippy::unnecessary_wraps)]
fn default_openai_key_env() -> Option<String> {
    Some("OPENAI_API_KEY".to_string())
}

#[allow(clippy::unnecessary_wraps)]
fn default_max_context_tokens() -> Option<usize> {
    Some(8191)
}

#[allow(clippy::unnecessary_wraps)]
fn default_tokenizer() -> Option<String> {
    Some(DEFAULT_TOKENIZER_MODEL.to_string())
}

fn default_batch_size() -> usize {
    256
}

fn default_max_retries() -> usize {
    3
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for OpenAiEmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
            request_dimensions: false,
            api_key_env: default_openai_key_env(),
            max_context_tokens: default_max_context_tokens(),
            tokenizer: default_tokenizer(),
            tokenizer_path: None,
            estimate_tokens: false,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OpenAiEmbeddingConfig {
    /// Token counter for `max_context_tokens`: a local file, then the
    /// heuristic when asked for, then a Hugging Face tokenizer.
    #[must_use]
    pub fn tokenizer_source(&self) -> Option<TokenizerSource> {
        if let Some(path) = &self.tokenizer_path {
            Some(TokenizerSource::File(path.clone()))
        } else if self.estimate_tokens {
            Some(TokenizerSource::Estimate)
        } else {
            self.tokenizer.clone().map(TokenizerSource::Pretrained)
        }
    }
}

// ============================================================================
// Language model
// ============================================================================

/// Chat provider selection, tagged by `provider`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum LlmConfig {
    #[serde(rename = "openai")]
    OpenAi(OpenAiLlmConfig),
    Anthropic(AnthropicLlmConfig),
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::OpenAi(OpenAiLlmConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiLlmConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_openai_chat_model")]
    pub model: String,

    #[serde(default = "default_openai_key_env")]
    pub api_key_env: Option<String>,
}

fn default_openai_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for OpenAiLlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_chat_model(),
            api_key_env: default_openai_key_env(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnthropicLlmConfig {
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,

    #[serde(default = "default_anthropic_model")]
    pub model: String,

    #[serde(default = "default_anthropic_key_env")]
    pub api_key_env: String,
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

fn default_anthropic_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

impl Default for AnthropicLlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_anthropic_base_url(),
            model: default_anthropic_model(),
            api_key_env: default_anthropic_key_env(),
        }
    }
}

// ============================================================================
// Store
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Lancedb,
    /// Process-local; contents are lost on exit
    Memory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Database directory (default: `<data dir>/index.lance`)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Resolve the database directory.
    pub fn db_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        let data = data_dir().context("Failed to get data directory")?;
        Ok(data.join("index.lance"))
    }
}

// ============================================================================
// Generation
// ============================================================================

/// File form of [`GenerationConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    #[serde(default = "default_min_similarity_score")]
    pub min_similarity_score: f32,

    #[serde(default = "default_max_documents")]
    pub max_documents: usize,

    #[serde(default = "default_max_validation_retries")]
    pub max_validation_retries: usize,

    #[serde(default = "default_max_root_fields")]
    pub max_root_fields: usize,

    #[serde(default = "default_timeout_secs")]
    pub llm_timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

fn default_min_similarity_score() -> f32 {
    0.4
}

fn default_max_documents() -> usize {
    50
}

fn default_max_validation_retries() -> usize {
    3
}

fn default_max_root_fields() -> usize {
    10
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> usize {
    2048
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            min_similarity_score: default_min_similarity_score(),
            max_documents: default_max_documents(),
            max_validation_retries: default_max_validation_retries(),
            max_root_fields: default_max_root_fields(),
            llm_timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl GenerationSettings {
    #[must_use]
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    #[must_use]
    pub fn to_generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            min_similarity_score: self.min_similarity_score,
            max_documents: self.max_documents,
            max_validation_retries: self.max_validation_retries,
            max_root_fields: self.max_root_fields,
            llm_timeout: self.llm_timeout(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

// ============================================================================
// Validator
// ============================================================================

/// Operation validator, tagged by `kind`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ValidatorConfig {
    /// Built-in structural check
    #[default]
    Syntax,
    /// External process speaking JSON over stdin/stdout
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default = "default_validator_timeout_secs")]
        timeout_secs: u64,
    },
}

fn default_validator_timeout_secs() -> u64 {
    30
}

// ============================================================================
// Logging
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

const SAMPLE_TOML: &str = r#"# gqlsearch configuration

[embedding]
provider = "openai"          # "openai" or "noop"
base_url = "https://api.openai.com/v1"
model = "text-embedding-3-small"
dimensions = 1536
api_key_env = "OPENAI_API_KEY"
max_context_tokens = 8191
tokenizer = "Xenova/text-embedding-ada-002"   # Hugging Face id with a tokenizer.json
# tokenizer_path = "/path/to/tokenizer.json"
# estimate_tokens = true     # character heuristic instead of a tokenizer

# Local Ollama:
# provider = "openai"
# base_url = "http://localhost:11434/v1"
# model = "nomic-embed-text"
# dimensions = 768
# tokenizer = "nomic-ai/nomic-embed-text-v1.5"

[llm]
provider = "openai"          # "openai" or "anthropic"
model = "gpt-4o-mini"
api_key_env = "OPENAI_API_KEY"

[store]
backend = "lancedb"          # "lancedb" or "memory"
# path = "/var/lib/gqlsearch/index.lance"

[generation]
min_similarity_score = 0.4
max_documents = 50
max_validation_retries = 3
max_root_fields = 10
llm_timeout_secs = 60
temperature = 0.2
max_tokens = 2048

[validator]
kind = "syntax"              # "syntax" or "command"
# kind = "command"
# program = "node"
# args = ["validate.js"]

[logging]
level = "info"
"#;

impl Config {
    /// Load from `path`, or from the default location when it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => match Self::config_path() {
                Some(default) if default.exists() => Self::load_from(&default),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Load from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Default config file location.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Commented sample written by `config init`.
    #[must_use]
    pub fn sample_toml() -> &'static str {
        SAMPLE_TOML
    }
}

/// Read an API key from the named environment variable.
#[must_use]
pub fn api_key_from_env(var: Option<&str>) -> Option<String> {
    let var = var?;
    std::env::var(var).ok().filter(|key| !key.trim().is_empty())
}

/// Get the data directory for gqlsearch.
pub fn data_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("GQLSEARCH_DATA_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "gqlsearch").map(|dirs| dirs.data_dir().to_path_buf())
}

/// Get the config directory for gqlsearch.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("GQLSEARCH_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "gqlsearch").map(|dirs| dirs.config_dir().to_path_buf())
}
