//! # gqlsearch CLI
//!
//! Command-line interface for gqlsearch.
//!
//! gqlsearch indexes the declarations of a GraphQL schema as vector
//! embeddings and turns natural-language requests into GraphQL operations
//! by searching that index and prompting a language model.
//!
//! ## Commands
//!
//! - `gqlsearch index <SCHEMA>` - Decompose, embed and store a schema
//! - `gqlsearch search <TEXT>` - Similarity search over declarations
//! - `gqlsearch generate <TEXT>` - Synthesize and validate an operation
//! - `gqlsearch status` - Show index statistics
//! - `gqlsearch clear` - Remove every indexed declaration
//!
//! ## Examples
//!
//! ```bash
//! # Index a schema
//! gqlsearch index schema.graphql
//!
//! # Find the declarations closest to a request
//! gqlsearch search "posts written by a user" --roots-only
//!
//! # Generate an operation, with diagnostics as JSON
//! gqlsearch generate "create a post titled Hello" --format json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gqlsearch_core::{
    EmbedResult, EmbeddingProvider, LanguageModel, MetadataFilter, MetadataStore, SchemaDecomposer,
    SearchOptions, SearchResult, Validator, VectorStore, keys,
};
use gqlsearch_embed::{NoopEmbedder, OpenAiEmbedder, OpenAiEmbedderOptions};
use gqlsearch_generate::{CommandValidator, OperationGenerator, SyntaxValidator};
use gqlsearch_index::EmbeddingService;
use gqlsearch_llm::{AnthropicChat, AnthropicChatOptions, OpenAiChat, OpenAiChatOptions};
use gqlsearch_schema::SdlDecomposer;
use gqlsearch_store::{LanceStore, MemoryStore};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

mod config;

use config::{
    Config, EmbeddingConfig, LlmConfig, StoreBackend, ValidatorConfig, api_key_from_env,
};

/// Metadata key under which the raw SDL is kept for validation.
const SCHEMA_KEY: &str = "schema";

/// Exit status when the final operation did not validate.
const EXIT_INVALID: u8 = 2;

#[derive(Parser)]
#[command(name = "gqlsearch")]
#[command(about = "Turn natural-language requests into GraphQL operations")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ~/.config/gqlsearch/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompose, embed and store a GraphQL schema
    Index {
        /// Schema file (SDL)
        schema: PathBuf,

        /// Remove existing documents first
        #[arg(long)]
        clear: bool,
    },

    /// Similarity search over indexed declarations
    Search {
        /// Request text
        text: String,

        /// Maximum results
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Only root operation fields
        #[arg(long)]
        roots_only: bool,
    },

    /// Generate a GraphQL operation for a request
    Generate {
        /// Request text
        text: String,
    },

    /// Show index status
    Status,

    /// Remove every indexed document
    Clear,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Print sample configuration file
    Init,
    /// Show config file path
    Path,
}

/// Output structure for `index`.
#[derive(Serialize)]
struct IndexOutput {
    schema: String,
    declarations: usize,
    vector_index: bool,
    #[serde(flatten)]
    result: EmbedResult,
}

/// Output structure for `search`.
#[derive(Serialize)]
struct SearchOutput {
    query: String,
    results: Vec<ResultItem>,
}

#[derive(Serialize)]
struct ResultItem {
    id: String,
    kind: String,
    name: String,
    score: f32,
    content: String,
}

impl From<&SearchResult> for ResultItem {
    fn from(result: &SearchResult) -> Self {
        Self {
            id: result.document.id.clone(),
            kind: result.document.kind.to_string(),
            name: result.document.name.clone(),
            score: result.score,
            content: truncate(&result.document.content, 200),
        }
    }
}

/// Output structure for `status`.
#[derive(Serialize)]
struct StatusOutput {
    backend: StoreBackend,
    location: String,
    documents: u64,
    schema_indexed: bool,
    embedding_dimensions: usize,
}

/// Vector and metadata views of one store.
struct StoreHandle {
    vectors: Arc<dyn VectorStore>,
    metadata: Arc<dyn MetadataStore>,
    /// Set for the LanceDB backend, which can build an ANN index
    lance: Option<Arc<LanceStore>>,
    location: String,
}

impl StoreHandle {
    /// Build the vector index when the backend supports one.
    async fn optimize(&self) -> Result<bool> {
        let Some(lance) = &self.lance else {
            return Ok(false);
        };
        let built = lance.optimize().await.context("Failed to build vector index")?;
        if built {
            info!("Built vector index at {}", self.location);
        }
        Ok(built)
    }
}

/// Open the configured store and make sure its tables exist.
async fn open_store(config: &Config) -> Result<StoreHandle> {
    let dimensions = config.embedding.dimensions();
    let handle = match config.store.backend {
        StoreBackend::Lancedb => {
            let db_path = config.store.db_path()?;
            let store = Arc::new(LanceStore::new(db_path.clone(), dimensions));
            StoreHandle {
                vectors: store.clone(),
                metadata: store.clone(),
                lance: Some(store),
                location: db_path.display().to_string(),
            }
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store; the index is discarded on exit");
            let store = Arc::new(MemoryStore::new(dimensions));
            StoreHandle {
                vectors: store.clone(),
                metadata: store,
                lance: None,
                location: "memory".to_string(),
            }
        }
    };

    handle
        .vectors
        .initialize()
        .await
        .context("Failed to initialize store")?;
    Ok(handle)
}

/// Create and probe the configured embedding provider.
async fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match config {
        EmbeddingConfig::OpenAi(openai) => Arc::new(
            OpenAiEmbedder::new(OpenAiEmbedderOptions {
                base_url: openai.base_url.clone(),
                api_key: api_key_from_env(openai.api_key_env.as_deref()),
                model: openai.model.clone(),
                dimensions: openai.dimensions,
                request_dimensions: openai.request_dimensions,
                max_context_tokens: openai.max_context_tokens,
                tokenizer: openai.tokenizer_source(),
                timeout: Duration::from_secs(openai.timeout_secs),
                max_retries: openai.max_retries,
                batch_size: openai.batch_size,
            })
            .context("Failed to create embedder")?,
        ),
        EmbeddingConfig::Noop { dimensions } => Arc::new(NoopEmbedder::with_dimension(*dimensions)),
    };

    info!("Initializing embedder {}", embedder.model_name());
    embedder
        .initialize()
        .await
        .context("Failed to initialize embedder")?;
    Ok(embedder)
}

fn create_llm(config: &Config) -> Result<Arc<dyn LanguageModel>> {
    let timeout = config.generation.llm_timeout();
    let llm: Arc<dyn LanguageModel> = match &config.llm {
        LlmConfig::OpenAi(openai) => Arc::new(
            OpenAiChat::new(OpenAiChatOptions {
                base_url: openai.base_url.clone(),
                api_key: api_key_from_env(openai.api_key_env.as_deref()),
                model: openai.model.clone(),
                timeout,
            })
            .context("Failed to create OpenAI chat client")?,
        ),
        LlmConfig::Anthropic(anthropic) => {
            let api_key = api_key_from_env(Some(&anthropic.api_key_env)).with_context(|| {
                format!("Environment variable {} is not set", anthropic.api_key_env)
            })?;
            Arc::new(
                AnthropicChat::new(AnthropicChatOptions {
                    base_url: anthropic.base_url.clone(),
                    api_key,
                    model: anthropic.model.clone(),
                    timeout,
                })
                .context("Failed to create Anthropic chat client")?,
            )
        }
    };
    Ok(llm)
}

fn create_validator(config: &ValidatorConfig) -> Arc<dyn Validator> {
    match config {
        ValidatorConfig::Syntax => Arc::new(SyntaxValidator::new()),
        ValidatorConfig::Command {
            program,
            args,
            timeout_secs,
        } => Arc::new(
            CommandValidator::new(program.clone(), args.clone())
                .with_timeout(Duration::from_secs(*timeout_secs)),
        ),
    }
}

fn init_logging(verbose: bool, configured: &str) -> Result<()> {
    let level = if verbose {
        Level::DEBUG
    } else {
        configured.parse().unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load config")?;
    init_logging(cli.verbose, &config.logging.level)?;

    match cli.command {
        Commands::Index { schema, clear } => {
            let sdl = std::fs::read_to_string(&schema)
                .with_context(|| format!("Failed to read schema {}", schema.display()))?;

            let decomposer = Arc::new(SdlDecomposer::new());
            let documents = decomposer
                .parse(&sdl)
                .with_context(|| format!("Failed to parse schema {}", schema.display()))?;
            info!(
                "Decomposed {} into {} declarations",
                schema.display(),
                documents.len()
            );

            let store = open_store(&config).await?;
            if clear {
                store.vectors.clear().await.context("Failed to clear store")?;
            }

            let embedder = create_embedder(&config.embedding).await?;
            let service = EmbeddingService::new(embedder.clone(), decomposer, store.vectors.clone());
            let result = service
                .embed_and_store(&documents)
                .await
                .context("Failed to embed schema")?;
            let vector_index = store.optimize().await?;

            store
                .metadata
                .set_metadata(SCHEMA_KEY, &sdl)
                .await
                .context("Failed to save schema")?;
            embedder.dispose().await.context("Failed to release embedder")?;
            store.vectors.close().await.context("Failed to close store")?;

            let output = IndexOutput {
                schema: schema.display().to_string(),
                declarations: documents.len(),
                vector_index,
                result,
            };
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
                OutputFormat::Text => print_index(&output),
            }
        }

        Commands::Search {
            text,
            limit,
            roots_only,
        } => {
            let store = open_store(&config).await?;
            let embedder = create_embedder(&config.embedding).await?;
            let embedding = embedder.embed(&text).await.context("Failed to embed query")?;

            let mut options = SearchOptions::new(limit);
            if roots_only {
                options = options
                    .with_metadata_filter(MetadataFilter::eq(keys::IS_ROOT_OPERATION_FIELD, true));
            }
            let results = store
                .vectors
                .search(&embedding, &options)
                .await
                .context("Search failed")?;

            let output = SearchOutput {
                query: text,
                results: results.iter().map(ResultItem::from).collect(),
            };
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
                OutputFormat::Text => {
                    println!("Query: {}\n", output.query);
                    if output.results.is_empty() {
                        println!("No results found.");
                    }
                    for (i, item) in output.results.iter().enumerate() {
                        println!(
                            "{}. {} {} (score: {:.3})",
                            i + 1,
                            item.kind,
                            item.name,
                            item.score
                        );
                        println!("   {}", item.content);
                        println!();
                    }
                }
            }
        }

        Commands::Generate { text } => {
            let store = open_store(&config).await?;
            let schema = store
                .metadata
                .get_metadata(SCHEMA_KEY)
                .await
                .context("Failed to read stored schema")?
                .context("No schema indexed. Run 'gqlsearch index <SCHEMA>' first.")?;

            let embedder = create_embedder(&config.embedding).await?;
            let embedding = embedder.embed(&text).await.context("Failed to embed request")?;

            let generator = OperationGenerator::new(
                store.vectors.clone(),
                create_llm(&config)?,
                create_validator(&config.validator),
                schema,
                config.generation.to_generation_config(),
            );
            let result = generator
                .generate(&text, embedding)
                .await
                .context("Generation failed")?;

            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                OutputFormat::Text => {
                    println!("{}\n", result.operation);
                    println!("# type: {}", result.operation_type);
                    println!(
                        "# root field: {} ({})",
                        result.root_field.name,
                        result.diagnostics.selection_tier.as_str()
                    );
                    println!(
                        "# attempts: {}, valid: {}",
                        result.validation_attempts, result.valid
                    );
                    if result.diagnostics.closure_truncated {
                        println!(
                            "# type closure truncated at {} documents",
                            result.diagnostics.closure_size
                        );
                    }
                    for error in &result.diagnostics.last_errors {
                        println!("# error: {error}");
                    }
                }
            }

            if !result.valid {
                warn!(
                    "Operation failed validation after {} attempts",
                    result.validation_attempts
                );
                return Ok(ExitCode::from(EXIT_INVALID));
            }
        }

        Commands::Status => {
            let store = open_store(&config).await?;
            let documents = store.vectors.count().await.context("Failed to count documents")?;
            let schema_indexed = store
                .metadata
                .get_metadata(SCHEMA_KEY)
                .await
                .context("Failed to read stored schema")?
                .is_some();

            let output = StatusOutput {
                backend: config.store.backend,
                location: store.location,
                documents,
                schema_indexed,
                embedding_dimensions: config.embedding.dimensions(),
            };
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
                OutputFormat::Text => {
                    println!("Index: {}", output.location);
                    println!("  Documents: {}", output.documents);
                    println!("  Schema stored: {}", output.schema_indexed);
                    println!("  Embedding dimensions: {}", output.embedding_dimensions);
                }
            }
        }

        Commands::Clear => {
            let store = open_store(&config).await?;
            let before = store.vectors.count().await.context("Failed to count documents")?;
            store.vectors.clear().await.context("Failed to clear store")?;
            info!("Removed {} documents from {}", before, store.location);
            match cli.format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({ "location": store.location, "removed": before })
                ),
                OutputFormat::Text => println!("Removed {before} documents."),
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
                OutputFormat::Text => println!(
                    "{}",
                    toml::to_string_pretty(&config).context("Failed to serialize config")?
                ),
            },
            ConfigAction::Init => {
                println!("{}", Config::sample_toml());
            }
            ConfigAction::Path => {
                if let Some(path) = Config::config_path() {
                    println!("{}", path.display());
                } else {
                    println!("Could not determine config directory");
                }
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}

fn print_index(output: &IndexOutput) {
    let result = &output.result;
    println!("Indexed {}", output.schema);
    println!("  Declarations: {}", output.declarations);
    println!("  Embedded: {}", result.embedded_count);
    println!("  Chunked: {}", result.chunked_count);
    for chunked in &result.chunked_documents {
        println!(
            "    - {} ({} tokens, {} chunks)",
            chunked.name, chunked.token_count, chunked.chunk_count
        );
    }
    println!("  Skipped: {}", result.skipped_count);
    for skipped in &result.skipped_documents {
        println!(
            "    - {} ({} tokens, limit {})",
            skipped.name, skipped.token_count, skipped.limit
        );
    }
    println!("  Records stored: {}", result.stored_count);
    if output.vector_index {
        println!("  Vector index: built");
    }
}

/// Flatten to one line and cap at `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    let s = s.replace('\n', " ").replace('\r', "");
    if s.chars().count() <= max_len {
        s
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("type User {\n  id: ID!\n}", 100), "type User {   id: ID! }");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
        assert_eq!(truncate("ééééé", 4), "é...");
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "gqlsearch",
            "--format",
            "json",
            "search",
            "posts by user",
            "--limit",
            "3",
            "--roots-only",
        ])
        .unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
        match cli.command {
            Commands::Search {
                text,
                limit,
                roots_only,
            } => {
                assert_eq!(text, "posts by user");
                assert_eq!(limit, 3);
                assert!(roots_only);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_validator_from_config() {
        // both kinds construct without touching the filesystem
        let _ = create_validator(&ValidatorConfig::Syntax);
        let _ = create_validator(&ValidatorConfig::Command {
            program: "true".to_string(),
            args: vec![],
            timeout_secs: 1,
        });
    }

    #[tokio::test]
    async fn test_memory_store_handle() {
        let config = Config {
            embedding: EmbeddingConfig::Noop { dimensions: 4 },
            store: config::StoreConfig {
                backend: StoreBackend::Memory,
                path: None,
            },
            ..Config::default()
        };
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.location, "memory");
        store.metadata.set_metadata(SCHEMA_KEY, "type Query { a: Int }").await.unwrap();
        assert_eq!(
            store.metadata.get_metadata(SCHEMA_KEY).await.unwrap().as_deref(),
            Some("type Query { a: Int }")
        );
        assert_eq!(store.vectors.count().await.unwrap(), 0);
        assert!(store.lance.is_none());
        assert!(!store.optimize().await.unwrap());
    }

    #[tokio::test]
    async fn test_lance_store_handle_optimizes() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            embedding: EmbeddingConfig::Noop { dimensions: 4 },
            store: config::StoreConfig {
                backend: StoreBackend::Lancedb,
                path: Some(temp.path().join("index.lance")),
            },
            ..Config::default()
        };
        let store = open_store(&config).await.unwrap();
        assert!(store.lance.is_some());
        // below the row threshold the table stays exhaustive
        assert!(!store.optimize().await.unwrap());
        store.vectors.close().await.unwrap();
    }
}
